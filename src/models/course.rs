// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course model and its public (teaser) projection.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationError};

use crate::models::discussion::{Question, Review, ReviewPreview};

/// Resource link attached to a content section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Link {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(url)]
    pub url: String,
}

/// One ordered content section (a video lesson).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSection {
    pub id: String,
    pub title: String,
    /// Chapter heading this section is grouped under
    #[serde(default)]
    pub video_section: String,
    pub description: String,
    /// Raw video location; never part of the public view
    pub video_url: String,
    /// Minutes
    #[serde(default)]
    pub video_length: u32,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// Course document stored in the primary database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// UUID (also used as document ID)
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub estimated_price: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub demo_url: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub sections: Vec<ContentSection>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    /// Mean of all review ratings
    #[serde(default)]
    pub rating: f64,
    /// Number of purchases
    #[serde(default)]
    pub purchased: u64,
    /// Optimistic-concurrency counter, bumped on every write
    #[serde(default)]
    pub version: u64,
    pub created_at: String,
    pub updated_at: String,
}

impl Course {
    /// Recompute the aggregate rating from scratch over all reviews.
    pub fn recompute_rating(&mut self) {
        self.rating = if self.reviews.is_empty() {
            0.0
        } else {
            let total: u32 = self.reviews.iter().map(|r| u32::from(r.rating)).sum();
            f64::from(total) / self.reviews.len() as f64
        };
    }

    pub fn section_mut(&mut self, section_id: &str) -> Option<&mut ContentSection> {
        self.sections.iter_mut().find(|s| s.id == section_id)
    }

    pub fn review_mut(&mut self, review_id: &str) -> Option<&mut Review> {
        self.reviews.iter_mut().find(|r| r.id == review_id)
    }

    /// Public view with video locations, resource links and questions removed.
    pub fn preview(&self) -> CoursePreview {
        CoursePreview {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            estimated_price: self.estimated_price,
            thumbnail: self.thumbnail.clone(),
            tags: self.tags.clone(),
            level: self.level.clone(),
            demo_url: self.demo_url.clone(),
            benefits: self.benefits.clone(),
            prerequisites: self.prerequisites.clone(),
            sections: self
                .sections
                .iter()
                .map(|s| SectionPreview {
                    id: s.id.clone(),
                    title: s.title.clone(),
                    video_section: s.video_section.clone(),
                    video_length: s.video_length,
                })
                .collect(),
            reviews: self.reviews.iter().map(Review::preview).collect(),
            rating: self.rating,
            purchased: self.purchased,
            updated_at: self.updated_at.clone(),
        }
    }
}

/// Admin-supplied course fields, used for both create and edit.
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "unique_section_ids"))]
pub struct CourseDraft {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default)]
    pub estimated_price: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub demo_url: String,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub sections: Vec<SectionDraft>,
}

/// Section ids address questions and replies, so a draft may not reuse one.
fn unique_section_ids(draft: &CourseDraft) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for id in draft.sections.iter().filter_map(|s| s.id.as_deref()) {
        if !seen.insert(id) {
            let mut err = ValidationError::new("duplicate_section_id");
            err.message = Some(format!("Duplicate section id {}", id).into());
            return Err(err);
        }
    }
    Ok(())
}

/// A section as sent by the course editor. Sections that carry the id of
/// an existing section keep their questions across edits.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SectionDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(default)]
    pub video_section: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub video_length: u32,
    #[serde(default)]
    #[validate(nested)]
    pub links: Vec<Link>,
}

impl Course {
    pub fn from_draft(draft: CourseDraft, now: &str) -> Self {
        let mut course = Course {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now.to_string(),
            ..Default::default()
        };
        course.apply_draft(draft, now);
        course
    }

    /// Overwrite the editable fields. Reviews, rating, purchase count and
    /// the questions of surviving sections are kept.
    pub fn apply_draft(&mut self, draft: CourseDraft, now: &str) {
        let mut previous = std::mem::take(&mut self.sections);

        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.estimated_price = draft.estimated_price;
        self.thumbnail = draft.thumbnail;
        self.tags = draft.tags;
        self.level = draft.level;
        self.demo_url = draft.demo_url;
        self.benefits = draft.benefits;
        self.prerequisites = draft.prerequisites;
        self.sections = draft
            .sections
            .into_iter()
            .map(|s| {
                let questions = s
                    .id
                    .as_deref()
                    .and_then(|id| previous.iter().position(|p| p.id == id))
                    .map(|idx| previous.swap_remove(idx).questions)
                    .unwrap_or_default();
                ContentSection {
                    id: s.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    title: s.title,
                    video_section: s.video_section,
                    description: s.description,
                    video_url: s.video_url,
                    video_length: s.video_length,
                    links: s.links,
                    questions,
                }
            })
            .collect();
        self.updated_at = now.to_string();
    }
}

/// Section outline safe for unauthenticated readers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionPreview {
    pub id: String,
    pub title: String,
    pub video_section: String,
    pub video_length: u32,
}

/// Course teaser served from the content cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePreview {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub estimated_price: Option<f64>,
    pub thumbnail: Option<String>,
    pub tags: String,
    pub level: String,
    pub demo_url: String,
    pub benefits: Vec<String>,
    pub prerequisites: Vec<String>,
    pub sections: Vec<SectionPreview>,
    pub reviews: Vec<ReviewPreview>,
    pub rating: f64,
    pub purchased: u64,
    pub updated_at: String,
}
