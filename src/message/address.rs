//! Address list parsing with a fallback for non-conformant mailers
//!
//! Standard RFC 5322 parsing is delegated to `mailparse::addrparse`. Headers it
//! rejects are split on `", "` and every element that still fails is handed to
//! [`parse_nonstandard_address`], which never fails.

use mailparse::MailAddr;

/// A single mailbox extracted from an address header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name, possibly empty
    pub name: String,
    /// The `local@domain` part
    pub address: String,
}

impl Address {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
        }
    }
}

/// Parse an address list header value.
///
/// Group syntax is flattened into its members.
pub fn parse_address_list(value: &str) -> Vec<Address> {
    if value.trim().is_empty() {
        return Vec::new();
    }

    match mailparse::addrparse(value) {
        Ok(list) => flatten(list.iter()),
        Err(_) => value
            .split(", ")
            .filter(|part| !part.trim().is_empty())
            .flat_map(|part| match mailparse::addrparse(part) {
                Ok(list) => flatten(list.iter()),
                Err(_) => vec![parse_nonstandard_address(part)],
            })
            .collect(),
    }
}

fn flatten<'a>(addrs: impl Iterator<Item = &'a MailAddr>) -> Vec<Address> {
    let mut out = Vec::new();
    for addr in addrs {
        match addr {
            MailAddr::Single(info) => out.push(Address::new(
                info.display_name.clone().unwrap_or_default(),
                info.addr.clone(),
            )),
            MailAddr::Group(group) => out.extend(group.addrs.iter().map(|info| {
                Address::new(info.display_name.clone().unwrap_or_default(), info.addr.clone())
            })),
        }
    }
    out
}

/// Best-effort extraction of one address from a malformed header element.
///
/// The address is taken from between `<` and `>` when a `<` is present,
/// otherwise from the first whitespace-delimited token containing `@`. A name
/// in parentheses following the address is picked up as the display name.
pub fn parse_nonstandard_address(s: &str) -> Address {
    let (address, rest) = match s.find('<') {
        Some(open) => {
            let after = &s[open + 1..];
            match after.find('>') {
                Some(close) => (after[..close].trim(), &after[close + 1..]),
                None => (after.trim(), ""),
            }
        }
        None => match s.find('@') {
            Some(at) => {
                let start = s[..at]
                    .char_indices()
                    .rev()
                    .find(|(_, c)| c.is_whitespace())
                    .map(|(i, c)| i + c.len_utf8())
                    .unwrap_or(0);
                let end = s[at..]
                    .find(char::is_whitespace)
                    .map(|i| at + i)
                    .unwrap_or(s.len());
                (s[start..end].trim_matches(|c| c == '"' || c == ','), &s[end..])
            }
            None => (s.trim(), ""),
        },
    };

    let rest = rest.trim_start();
    let name = match rest.strip_prefix('(') {
        Some(inner) => inner.split(')').next().unwrap_or_default().trim(),
        None => "",
    };

    Address::new(name, address)
}
