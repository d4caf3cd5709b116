use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::config::ChannelLink;

/// Channels one to six two per row, any further ones alone, then "Check".
pub fn channel_keyboard(channels: &[ChannelLink]) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = channels
        .iter()
        .filter_map(|c| match Url::parse(&c.url) {
            Ok(url) => Some(InlineKeyboardButton::url(c.label.clone(), url)),
            Err(e) => {
                tracing::warn!("Skipping channel {} with bad url {:?}: {}", c.chat, c.url, e);
                None
            }
        })
        .collect();

    let paired = buttons.len().min(6);
    let mut grid: Vec<Vec<InlineKeyboardButton>> = Vec::new();
    let mut iter = buttons.into_iter();
    let mut row = Vec::new();
    for button in iter.by_ref().take(paired) {
        row.push(button);
        if row.len() == 2 {
            grid.push(std::mem::take(&mut row));
        }
    }
    if !row.is_empty() {
        grid.push(row);
    }
    for button in iter {
        grid.push(vec![button]);
    }

    grid.push(vec![InlineKeyboardButton::callback("✅ Check", "check_channels")]);
    InlineKeyboardMarkup::new(grid)
}

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("🔗 Refer Link", "refer_link"),
            InlineKeyboardButton::callback("💰 My Points", "my_points"),
        ],
        vec![InlineKeyboardButton::callback("🎯 Start Lookup", "start_wizard")],
    ])
}

pub fn vpn_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("Yes, use VPN", "vpn_yes")],
        vec![InlineKeyboardButton::callback("No, don't use VPN", "vpn_no")],
    ])
}
