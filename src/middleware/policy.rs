// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Declarative authorization.
//!
//! Every role and ownership check lives in [`POLICY`]. Routes declare the
//! action they perform with [`enforce`]; handlers that act on a specific
//! course call [`authorize`] once the course id is known.

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{Role, SessionUser};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadCourseContent,
    AddQuestion,
    AddAnswer,
    AddReview,
    ReplyToReview,
    CreateCourse,
    EditCourse,
    DeleteCourse,
    ListAllCourses,
    ListUsers,
    UpdateUserRole,
    DeleteUser,
    ListNotifications,
    UpdateNotification,
    UpdateOwnProfile,
    PlaceOrder,
}

/// How the caller must relate to the target course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Any,
    /// The course is in the caller's purchase list.
    Entitled,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub role: Role,
    pub action: Action,
    pub relation: Relation,
}

const fn rule(role: Role, action: Action, relation: Relation) -> Rule {
    Rule {
        role,
        action,
        relation,
    }
}

pub const POLICY: &[Rule] = &[
    // Learners
    rule(Role::User, Action::ReadCourseContent, Relation::Entitled),
    rule(Role::User, Action::AddQuestion, Relation::Any),
    rule(Role::User, Action::AddAnswer, Relation::Any),
    rule(Role::User, Action::AddReview, Relation::Entitled),
    rule(Role::User, Action::UpdateOwnProfile, Relation::Any),
    rule(Role::User, Action::PlaceOrder, Relation::Any),
    // Admins get the learner actions with the same ownership rules
    rule(Role::Admin, Action::ReadCourseContent, Relation::Entitled),
    rule(Role::Admin, Action::AddQuestion, Relation::Any),
    rule(Role::Admin, Action::AddAnswer, Relation::Any),
    rule(Role::Admin, Action::AddReview, Relation::Entitled),
    rule(Role::Admin, Action::UpdateOwnProfile, Relation::Any),
    rule(Role::Admin, Action::PlaceOrder, Relation::Any),
    // Admin only
    rule(Role::Admin, Action::ReplyToReview, Relation::Any),
    rule(Role::Admin, Action::CreateCourse, Relation::Any),
    rule(Role::Admin, Action::EditCourse, Relation::Any),
    rule(Role::Admin, Action::DeleteCourse, Relation::Any),
    rule(Role::Admin, Action::ListAllCourses, Relation::Any),
    rule(Role::Admin, Action::ListUsers, Relation::Any),
    rule(Role::Admin, Action::UpdateUserRole, Relation::Any),
    rule(Role::Admin, Action::DeleteUser, Relation::Any),
    rule(Role::Admin, Action::ListNotifications, Relation::Any),
    rule(Role::Admin, Action::UpdateNotification, Relation::Any),
];

fn rules_for(role: Role, action: Action) -> impl Iterator<Item = &'static Rule> {
    POLICY
        .iter()
        .filter(move |r| r.role == role && r.action == action)
}

fn role_denied(role: Role) -> AppError {
    AppError::Forbidden(format!(
        "Role: {} is not allowed to access this resource",
        role
    ))
}

/// Whether the role may perform the action on at least some resource.
pub fn authorize_role(role: Role, action: Action) -> Result<(), AppError> {
    if rules_for(role, action).next().is_some() {
        Ok(())
    } else {
        Err(role_denied(role))
    }
}

/// Full check including the caller's relation to `course_id`.
pub fn authorize(
    user: &SessionUser,
    action: Action,
    course_id: Option<&str>,
) -> Result<(), AppError> {
    let mut matched = false;
    for rule in rules_for(user.role, action) {
        matched = true;
        match rule.relation {
            Relation::Any => return Ok(()),
            Relation::Entitled => {
                if course_id.is_some_and(|id| user.has_course(id)) {
                    return Ok(());
                }
            }
        }
    }

    if matched {
        Err(AppError::Forbidden(
            "You are not eligible to access this course".to_string(),
        ))
    } else {
        Err(role_denied(user.role))
    }
}

/// Route-level role check. Runs inside the authentication layer; with no
/// authenticated user the answer is 401, never 403.
pub async fn enforce(
    State(action): State<Action>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(AppError::Unauthenticated)?;

    authorize_role(auth_user.role, action).inspect_err(|_| {
        tracing::info!(
            user_id = %auth_user.id,
            role = %auth_user.role,
            action = ?action,
            "Action denied by policy"
        );
    })?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, courses: &[&str]) -> SessionUser {
        SessionUser {
            id: "u1".to_string(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            avatar: None,
            role,
            is_verified: true,
            courses: courses.iter().map(|c| c.to_string()).collect(),
            created_at: "t0".to_string(),
        }
    }

    #[test]
    fn test_admin_only_actions() {
        for action in [
            Action::CreateCourse,
            Action::EditCourse,
            Action::DeleteCourse,
            Action::ListAllCourses,
            Action::ListUsers,
            Action::UpdateUserRole,
            Action::DeleteUser,
            Action::ListNotifications,
            Action::UpdateNotification,
            Action::ReplyToReview,
        ] {
            assert!(authorize_role(Role::Admin, action).is_ok(), "{:?}", action);
            assert!(
                matches!(authorize_role(Role::User, action), Err(AppError::Forbidden(_))),
                "{:?}",
                action
            );
        }
    }

    #[test]
    fn test_entitled_relation() {
        let buyer = user(Role::User, &["c1"]);

        assert!(authorize(&buyer, Action::AddReview, Some("c1")).is_ok());
        assert!(matches!(
            authorize(&buyer, Action::AddReview, Some("c2")),
            Err(AppError::Forbidden(_))
        ));
        assert!(authorize(&buyer, Action::AddReview, None).is_err());
    }

    #[test]
    fn test_admin_is_not_entitled_by_role() {
        let admin = user(Role::Admin, &[]);

        assert!(authorize_role(Role::Admin, Action::ReadCourseContent).is_ok());
        assert!(authorize(&admin, Action::ReadCourseContent, Some("c1")).is_err());
    }

    #[test]
    fn test_every_action_has_a_rule() {
        for action in [
            Action::ReadCourseContent,
            Action::AddQuestion,
            Action::AddAnswer,
            Action::AddReview,
            Action::UpdateOwnProfile,
            Action::PlaceOrder,
        ] {
            assert!(authorize_role(Role::User, action).is_ok(), "{:?}", action);
            assert!(authorize_role(Role::Admin, action).is_ok(), "{:?}", action);
        }
    }
}
