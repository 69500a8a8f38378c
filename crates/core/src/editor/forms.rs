use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{clean_list, slugify, trim, trim_opt, EditorForm};
use crate::content::Collection;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ServiceForm {
    #[validate(length(min = 1, max = 120, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_from: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
}

impl EditorForm for ServiceForm {
    const COLLECTION: Collection = Collection::Services;

    fn sanitize(&mut self) {
        trim(&mut self.title);
        trim(&mut self.description);
        trim_opt(&mut self.icon);
        trim_opt(&mut self.price_from);
        clean_list(&mut self.features);
        self.slug = slugify(if self.slug.trim().is_empty() { &self.title } else { &self.slug });
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PostForm {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 400, message = "excerpt is limited to 400 characters"))]
    pub excerpt: Option<String>,
    /// Rich-text HTML produced by the console editor widget.
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
}

impl EditorForm for PostForm {
    const COLLECTION: Collection = Collection::Posts;

    fn sanitize(&mut self) {
        trim(&mut self.title);
        trim(&mut self.content);
        trim_opt(&mut self.excerpt);
        trim_opt(&mut self.cover_image);
        for tag in self.tags.iter_mut() {
            *tag = tag.to_lowercase();
        }
        clean_list(&mut self.tags);
        self.slug = slugify(if self.slug.trim().is_empty() { &self.title } else { &self.slug });
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct TestimonialForm {
    #[validate(length(min = 1, message = "client name is required"))]
    pub client_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[validate(length(min = 1, max = 1200, message = "quote is required"))]
    pub quote: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 5, message = "rating must be between 1 and 5"))]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
}

impl EditorForm for TestimonialForm {
    const COLLECTION: Collection = Collection::Testimonials;

    fn sanitize(&mut self) {
        trim(&mut self.client_name);
        trim(&mut self.quote);
        trim_opt(&mut self.client_role);
        trim_opt(&mut self.company);
        trim_opt(&mut self.avatar_url);
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LeadForm {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
}

impl EditorForm for LeadForm {
    const COLLECTION: Collection = Collection::Leads;

    fn sanitize(&mut self) {
        trim(&mut self.name);
        trim(&mut self.message);
        self.email = self.email.trim().to_lowercase();
        trim_opt(&mut self.phone);
        trim_opt(&mut self.company);
        trim_opt(&mut self.service);
        trim_opt(&mut self.budget);
        trim_opt(&mut self.notes);
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CaseStudyForm {
    #[validate(length(min = 1, max = 200, message = "title is required"))]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[validate(length(min = 1, message = "client is required"))]
    pub client: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[validate(length(min = 1, message = "summary is required"))]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default)]
    pub results: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing)]
    pub status: Option<String>,
}

impl EditorForm for CaseStudyForm {
    const COLLECTION: Collection = Collection::CaseStudies;

    fn sanitize(&mut self) {
        trim(&mut self.title);
        trim(&mut self.client);
        trim(&mut self.summary);
        trim_opt(&mut self.industry);
        trim_opt(&mut self.challenge);
        trim_opt(&mut self.solution);
        trim_opt(&mut self.cover_image);
        clean_list(&mut self.results);
        self.slug = slugify(if self.slug.trim().is_empty() { &self.title } else { &self.slug });
    }

    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_payload, EditorError};
    use crate::content::{Collection, Status};
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn service_is_trimmed_and_slugged() {
        let draft = parse_payload(
            Collection::Services,
            json!({
                "title": "  Web Design  ",
                "description": " Sites that convert ",
                "features": ["Responsive", " Responsive ", ""],
                "icon": "  ",
                "status": "Active"
            }),
        )
        .unwrap();
        assert_eq!(draft.status, Status::Active);
        assert_eq!(draft.fields["title"], "Web Design");
        assert_eq!(draft.fields["slug"], "web-design");
        assert_eq!(draft.fields["features"], json!(["Responsive"]));
        assert!(draft.fields.get("icon").is_none());
    }

    #[test]
    fn blank_required_field_fails_after_trim() {
        let err = parse_payload(
            Collection::Services,
            json!({"title": "   ", "description": "d"}),
        )
        .unwrap_err();
        assert_matches!(err, EditorError::Invalid(_));
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn post_keeps_explicit_slug_and_lowercases_tags() {
        let draft = parse_payload(
            Collection::Posts,
            json!({
                "title": "Launch notes",
                "slug": "Our Launch",
                "content": "<p>x</p>",
                "tags": ["News", "news", "Design"]
            }),
        )
        .unwrap();
        assert_eq!(draft.fields["slug"], "our-launch");
        assert_eq!(draft.fields["tags"], json!(["news", "design"]));
    }

    #[test]
    fn testimonial_rating_range() {
        let err = parse_payload(
            Collection::Testimonials,
            json!({"client_name": "Ana", "quote": "Great", "rating": 9}),
        )
        .unwrap_err();
        assert_matches!(err, EditorError::Invalid(_));
    }

    #[test]
    fn lead_requires_valid_email() {
        let err = parse_payload(
            Collection::Leads,
            json!({"name": "Sam", "email": "not-an-email"}),
        )
        .unwrap_err();
        assert_matches!(err, EditorError::Invalid(_));

        let draft = parse_payload(
            Collection::Leads,
            json!({"name": "Sam", "email": " SAM@Example.com ", "status": "Contacted"}),
        )
        .unwrap();
        assert_eq!(draft.status, Status::Contacted);
        assert_eq!(draft.fields["email"], "sam@example.com");
    }

    #[test]
    fn case_study_defaults_to_draft() {
        let draft = parse_payload(
            Collection::CaseStudies,
            json!({"title": "Rebrand", "client": "Acme", "summary": "New identity"}),
        )
        .unwrap();
        assert_eq!(draft.status, Status::Draft);
        assert_eq!(draft.fields["slug"], "rebrand");
    }
}
