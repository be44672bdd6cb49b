// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activation;
pub mod content_cache;
pub mod courses;
pub mod discussion;
pub mod entitlement;
pub mod identity;
pub mod notifier;
pub mod orders;
pub mod password;
pub mod tokens;
pub mod users;

pub use activation::{Activation, ActivationService, PendingRegistration};
pub use content_cache::ContentCache;
pub use courses::CourseService;
pub use discussion::DiscussionService;
pub use entitlement::{Entitlement, EntitlementGate};
pub use identity::{IdentityError, IdentityVerifier, VerifiedIdentity};
pub use notifier::{LogMailer, Mail, Mailer, Notifier};
pub use orders::OrderService;
pub use tokens::{Claims, TokenError, TokenPair, TokenService};
pub use users::UserService;
