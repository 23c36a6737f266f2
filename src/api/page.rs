// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTML result page.

use crate::registration::{Outcome, OutcomeTag};

const INVITE_TEMPLATE: &str = include_str!("../../templates/invite.html");

/// Headline shown for each outcome.
pub fn headline(tag: OutcomeTag) -> &'static str {
    match tag {
        OutcomeTag::BadInput => "bad input",
        OutcomeTag::AlreadyRegistered => "wallet already registered",
        OutcomeTag::WalletNotFound => "wallet not found",
        OutcomeTag::Issued => "valid wallet!",
        OutcomeTag::UpstreamError | OutcomeTag::IssuerError | OutcomeTag::StoreError => {
            "something went wrong, please try again later"
        }
    }
}

/// Render the result page for a workflow outcome.
pub fn render_outcome(outcome: &Outcome) -> String {
    render(headline(outcome.tag), outcome.invite_url.as_deref())
}

/// Render the result page with a headline and an optional invite link.
pub fn render(status: &str, invite_url: Option<&str>) -> String {
    let invite = match invite_url {
        Some(url) => {
            let url = escape_html(url);
            format!(r#"<p class="invite"><a href="{url}">{url}</a></p>"#)
        }
        None => String::new(),
    };
    INVITE_TEMPLATE
        .replace("{{status}}", &escape_html(status))
        .replace("{{invite}}", &invite)
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
