// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering of abstract [`Keyboard`] layouts into Telegram markup.
//!
//! The main menu becomes a persistent reply keyboard; every other layout is
//! an inline keyboard whose buttons carry the shared callback ids.

use teloxide::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, ReplyMarkup,
};

use tether_core::{menu, Keyboard};

/// Renders an abstract keyboard into Telegram reply markup.
pub fn render(keyboard: Keyboard) -> ReplyMarkup {
    match keyboard {
        Keyboard::MainMenu => ReplyMarkup::Keyboard(
            KeyboardMarkup::new(vec![
                vec![
                    KeyboardButton::new(menu::LABEL_SIGN_IN),
                    KeyboardButton::new(menu::LABEL_ACCOUNT),
                ],
                vec![
                    KeyboardButton::new(menu::LABEL_SEND),
                    KeyboardButton::new(menu::LABEL_PURGE),
                ],
                vec![KeyboardButton::new(menu::LABEL_GHOST)],
            ])
            .resize_keyboard(),
        ),
        Keyboard::StartAuth => inline(vec![vec![("Sign in", menu::CB_AUTH_START)]]),
        Keyboard::CodeOptions => inline(vec![
            vec![("Resend code", menu::CB_RESEND)],
            vec![
                ("Send via SMS", menu::CB_RESEND_SMS),
                ("Call me", menu::CB_RESEND_CALL),
            ],
        ]),
        Keyboard::GhostToggle { enabled } => {
            if enabled {
                inline(vec![vec![("Turn ghost mode off", menu::CB_GHOST_OFF)]])
            } else {
                inline(vec![vec![("Turn ghost mode on", menu::CB_GHOST_ON)]])
            }
        }
        Keyboard::AccountActions => inline(vec![vec![("Log out", menu::CB_LOGOUT)]]),
    }
}

fn inline(rows: Vec<Vec<(&str, &str)>>) -> ReplyMarkup {
    ReplyMarkup::InlineKeyboard(InlineKeyboardMarkup::new(rows.into_iter().map(|row| {
        row.into_iter()
            .map(|(label, data)| InlineKeyboardButton::callback(label.to_string(), data.to_string()))
            .collect::<Vec<_>>()
    })))
}
