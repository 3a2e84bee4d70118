//! # SpendAhead backend
//!
//! `spendahead` is a personal finance tracking backend. The implemented core
//! is the authentication subsystem: accounts, JWT-based sessions, and the
//! self-service flows around them.
//!
//! ## Accounts and sessions
//!
//! - **Passwords** are hashed with bcrypt; plaintext never touches the store.
//! - **Tokens** are stateless JWTs tagged with a type (`access`, `refresh`,
//!   `password_reset`, `email_verification`) so one kind can never stand in
//!   for another. Any instance holding the signing secret can verify tokens
//!   issued by any other instance.
//! - **Account status** is an explicit state (`active`, `inactive`,
//!   `deleted`); `deleted` is terminal and frees the email for reuse.
//!
//! ## Anti-enumeration
//!
//! Login failures and password-reset requests return identical responses
//! whether or not the account exists. Only a valid access token on a
//! disabled account yields a distinct signal.

pub mod api;
pub mod auth;
pub mod cli;
