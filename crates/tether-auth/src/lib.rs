// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication core: input normalization, the per-user session registry,
//! and the multi-step sign-in state machine.

pub mod code;
pub mod machine;
pub mod registry;

pub use code::{normalize_code, normalize_phone, parse_credentials};
pub use machine::{
    AuthMachine, AuthSession, AuthState, Prompt, CB_AUTH_START, CB_RESEND, CB_RESEND_CALL,
    CB_RESEND_SMS, MAX_ATTEMPTS,
};
pub use registry::{bounded, SessionRegistry, SharedConnection};
