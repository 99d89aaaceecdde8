use std::io::Write;

use anyhow::Result;
use board_proxy::Account;
use tabwriter::TabWriter;

pub fn print_accounts<T: std::io::Write>(wr: T, accounts: &[Account]) -> Result<()> {
    let mut tw = TabWriter::new(wr);
    writeln!(tw, "ID\tName\tAccount ID\tAccount Type\tCustomer POC\tStatus\tEffort\tType\tClients")?;

    for account in accounts.iter() {
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            account.id,
            account.name,
            account.account_id,
            account.account_type,
            account.customer_poc,
            account.status,
            account.effort_level,
            account.kind,
            account.number_of_clients,
        )?;
    }

    tw.flush()?;

    Ok(())
}
