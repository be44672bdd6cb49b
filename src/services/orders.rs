// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course purchases.
//!
//! Payment capture happens upstream; an order here records the purchase,
//! which is what entitlement is derived from.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{Course, Notification, SessionUser};
use crate::services::courses::CourseService;
use crate::services::notifier::{Mail, Notifier};
use crate::services::tokens::TokenService;
use crate::services::users::UserService;
use crate::time_utils::now_rfc3339;
use std::sync::Arc;

#[derive(Clone)]
pub struct OrderService {
    db: Arc<dyn Database>,
    users: UserService,
    courses: CourseService,
    tokens: TokenService,
    notifier: Notifier,
}

impl OrderService {
    pub fn new(
        db: Arc<dyn Database>,
        users: UserService,
        courses: CourseService,
        tokens: TokenService,
        notifier: Notifier,
    ) -> Self {
        Self {
            db,
            users,
            courses,
            tokens,
            notifier,
        }
    }

    /// Record a purchase and refresh the buyer's session snapshot so the
    /// new entitlement applies to the very next request.
    pub async fn create_order(
        &self,
        buyer_id: &str,
        course_id: &str,
    ) -> Result<(SessionUser, Course), AppError> {
        if self.db.get_course(course_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Course {} not found", course_id)));
        }

        let (user, ()) = self
            .users
            .update(buyer_id, |user| {
                if user.has_course(course_id) {
                    return Err(AppError::Validation(
                        "You have already purchased this course".to_string(),
                    ));
                }
                user.courses.push(course_id.to_string());
                Ok(())
            })
            .await?;

        let session = SessionUser::from(&user);
        self.tokens.store_session(&session).await?;

        let (course, ()) = self
            .courses
            .update(course_id, |course| {
                course.purchased += 1;
                Ok(())
            })
            .await?;

        tracing::info!(user_id = %user.id, course_id, "Order created");
        self.notifier.notify(Notification::new(
            &user.id,
            "New Order",
            format!("You have a new order from {}", course.name),
            &now_rfc3339(),
        ));
        self.notifier.email(Mail {
            to: user.email.clone(),
            subject: "Order Confirmation".to_string(),
            body: format!(
                "Hi {}, thank you for purchasing {} ({:.2}).",
                user.name, course.name, course.price
            ),
        });

        Ok((session, course))
    }
}
