//! Flattens board rows into the account records the wizard selects from.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Column, ColumnValue, Item};

const ACCOUNT_ID: &[&str] = &["accountid", "account_id"];
const ACCOUNT_TYPE: &[&str] = &["accounttype", "account_type"];
const CUSTOMER_POC: &[&str] = &["customerpoc", "customer_poc"];
const STATUS: &[&str] = &["status"];
const EFFORT_LEVEL: &[&str] = &["effortlevel", "effort_level"];
const TYPE: &[&str] = &["type"];
const NUMBER_OF_CLIENTS: &[&str] = &["numberofclients", "number_of_clients"];

/// A candidate account as served to the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub account_id: String,
    pub account_type: String,
    #[serde(rename = "customerPOC")]
    pub customer_poc: String,
    pub status: String,
    pub effort_level: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub number_of_clients: i64,
}

impl Account {
    pub fn from_item(item: &Item, keys: &ColumnKeys) -> Self {
        let values = ItemValues::collect(keys, &item.column_values);

        Self {
            id: item.id.clone(),
            name: item.name.clone(),
            account_id: values.first_of(ACCOUNT_ID),
            account_type: values.first_of(ACCOUNT_TYPE),
            customer_poc: values.first_of(CUSTOMER_POC),
            status: values.first_of(STATUS),
            effort_level: values.first_of(EFFORT_LEVEL),
            kind: values.first_of(TYPE),
            number_of_clients: parse_count(&values.first_of(NUMBER_OF_CLIENTS)),
        }
    }
}

/// Lowercases a column title and drops every whitespace character.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Maps column ids to normalized title keys.
///
/// Ids without a known column, or whose title is blank, resolve to themselves
/// so their values are kept rather than dropped.
#[derive(Debug, Clone, Default)]
pub struct ColumnKeys(HashMap<String, String>);

impl ColumnKeys {
    pub fn from_columns(columns: &[Column]) -> Self {
        Self(
            columns
                .iter()
                .map(|c| (c.id.clone(), normalize_title(&c.title)))
                .collect(),
        )
    }

    pub fn key_for<'a>(&'a self, column_id: &'a str) -> &'a str {
        self.0
            .get(column_id)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
            .unwrap_or(column_id)
    }
}

/// One item's column texts keyed by normalized column key.
#[derive(Debug, Clone, Default)]
pub struct ItemValues(HashMap<String, String>);

impl ItemValues {
    pub fn collect(keys: &ColumnKeys, values: &[ColumnValue]) -> Self {
        Self(
            values
                .iter()
                .map(|v| {
                    (
                        keys.key_for(&v.id).to_string(),
                        v.text.clone().unwrap_or_default(),
                    )
                })
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The first non-empty value among `candidates`, or an empty string.
    pub fn first_of(&self, candidates: &[&str]) -> String {
        candidates
            .iter()
            .filter_map(|key| self.get(key))
            .find(|v| !v.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// Reads a leading base-10 integer, ignoring anything after the digits.
/// Empty or non-numeric input reads as zero.
pub fn parse_count(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (sign, rest) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s.strip_prefix('+').unwrap_or(s)),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());

    rest[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

/// Flattens every group's item page into accounts, preserving board order.
pub fn transform(board: &Board) -> Vec<Account> {
    let keys = ColumnKeys::from_columns(&board.columns);

    board
        .groups
        .iter()
        .flat_map(|group| group.items())
        .map(|item| Account::from_item(item, &keys))
        .collect()
}
