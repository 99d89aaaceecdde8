use anyhow::Result;
use board_proxy::AccountProxy;
use clap::ArgMatches;
use tracing::info;

use crate::display::print_accounts;
use crate::settings::Settings;

pub(crate) async fn run(_matches: &ArgMatches, settings: Settings) -> Result<()> {
    let proxy = AccountProxy::new(settings.proxy_config()?);
    let list = proxy.accounts().await?;

    if let Some(retry) = &list.retry_after {
        println!(
            "Board API query budget exhausted, retry in {} seconds.",
            retry
        );
        return Ok(());
    }

    info!(count = list.accounts.len(), "fetched accounts");
    print_accounts(std::io::stdout(), &list.accounts)?;

    Ok(())
}
