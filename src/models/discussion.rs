// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Threaded discussion model: questions and reviews with one level of replies.
//!
//! A [`Reply`] has no reply list of its own, so replying to a reply cannot
//! be expressed. Questions are stored inside exactly one content section
//! and reviews inside exactly one course.

use serde::{Deserialize, Serialize};

use crate::models::user::{Role, SessionUser};

/// Snapshot of the author at the time they posted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: Role,
}

impl From<&SessionUser> for Author {
    fn from(user: &SessionUser) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            role: user.role,
        }
    }
}

/// A leaf post. Replies cannot be replied to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    pub user: Author,
    pub body: String,
    pub created_at: String,
}

impl Reply {
    pub fn new(user: Author, body: String, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user,
            body,
            created_at: now.to_string(),
        }
    }
}

/// Whether a question has received any reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    #[default]
    Unanswered,
    Answered,
}

impl AnswerStatus {
    pub fn from_reply_count(count: usize) -> Self {
        if count == 0 {
            AnswerStatus::Unanswered
        } else {
            AnswerStatus::Answered
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub user: Author,
    pub body: String,
    #[serde(default)]
    pub replies: Vec<Reply>,
    /// Written alongside every reply insert. Older documents may lack it,
    /// so reads go through [`Question::status`].
    #[serde(default)]
    pub answer_status: AnswerStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Question {
    pub fn new(user: Author, body: String, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user,
            body,
            replies: Vec::new(),
            answer_status: AnswerStatus::Unanswered,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Answered state derived from the reply count.
    pub fn status(&self) -> AnswerStatus {
        AnswerStatus::from_reply_count(self.replies.len())
    }

    pub fn push_reply(&mut self, reply: Reply) {
        self.updated_at = reply.created_at.clone();
        self.replies.push(reply);
        self.answer_status = self.status();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user: Author,
    /// 1..=5
    pub rating: u8,
    pub comment: String,
    #[serde(default)]
    pub replies: Vec<Reply>,
    pub created_at: String,
    pub updated_at: String,
}

impl Review {
    pub fn new(user: Author, rating: u8, comment: String, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user,
            rating,
            comment,
            replies: Vec::new(),
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    pub fn push_reply(&mut self, reply: Reply) {
        self.updated_at = reply.created_at.clone();
        self.replies.push(reply);
    }
}

/// Author as shown to anonymous readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicAuthor {
    pub name: String,
    pub avatar: Option<String>,
}

impl From<&Author> for PublicAuthor {
    fn from(author: &Author) -> Self {
        Self {
            name: author.name.clone(),
            avatar: author.avatar.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPreview {
    pub id: String,
    pub user: PublicAuthor,
    pub body: String,
    pub created_at: String,
}

/// Review as it appears on the public course page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPreview {
    pub id: String,
    pub user: PublicAuthor,
    pub rating: u8,
    pub comment: String,
    pub replies: Vec<ReplyPreview>,
    pub created_at: String,
}

impl Review {
    pub fn preview(&self) -> ReviewPreview {
        ReviewPreview {
            id: self.id.clone(),
            user: PublicAuthor::from(&self.user),
            rating: self.rating,
            comment: self.comment.clone(),
            replies: self
                .replies
                .iter()
                .map(|r| ReplyPreview {
                    id: r.id.clone(),
                    user: PublicAuthor::from(&r.user),
                    body: r.body.clone(),
                    created_at: r.created_at.clone(),
                })
                .collect(),
            created_at: self.created_at.clone(),
        }
    }
}
