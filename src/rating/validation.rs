use super::config::RatingConfig;
use super::types::{RatingSubmission, ValidationIssue};

/// A submission that passed validation, reduced to what the engine needs
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRating {
    pub categories: Vec<i32>,
    pub overall: f64,
    pub review: Option<String>,
    pub anonymous: bool,
}

/// Check identifiers, category layout, scale and review length.
///
/// Every problem is reported at once; nothing is written when any is found.
pub fn validate_submission(
    config: &RatingConfig,
    entity_id: &str,
    author_id: &str,
    submission: &RatingSubmission,
) -> Result<ValidatedRating, Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    if entity_id.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "entity_id",
            "required",
            "entity id is required",
        ));
    }
    if author_id.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "author_id",
            "required",
            "author id is required",
        ));
    }

    let categories = if !submission.rates.is_empty() {
        if submission.rates.len() != config.category_count {
            issues.push(
                ValidationIssue::new(
                    "rates",
                    "length",
                    format!(
                        "expected {} category ratings, got {}",
                        config.category_count,
                        submission.rates.len()
                    ),
                )
                .with_param(config.category_count),
            );
        }
        for (index, value) in submission.rates.iter().enumerate() {
            check_scale(config, &format!("rates[{}]", index), *value, &mut issues);
        }
        submission.rates.clone()
    } else {
        match submission.rate {
            Some(value) => {
                if config.category_count != 1 {
                    issues.push(
                        ValidationIssue::new(
                            "rates",
                            "length",
                            format!(
                                "a single rating cannot fill {} categories",
                                config.category_count
                            ),
                        )
                        .with_param(config.category_count),
                    );
                }
                check_scale(config, "rate", value, &mut issues);
                vec![value]
            }
            None => {
                issues.push(ValidationIssue::new(
                    "rate",
                    "required",
                    "either rate or rates must be provided",
                ));
                Vec::new()
            }
        }
    };

    if let Some(review) = &submission.review {
        if review.chars().count() > config.max_review_length {
            issues.push(
                ValidationIssue::new("review", "maxlength", "review is too long")
                    .with_param(config.max_review_length),
            );
        }
    }

    if !issues.is_empty() {
        return Err(issues);
    }

    let overall = categories.iter().map(|v| *v as f64).sum::<f64>() / categories.len() as f64;

    Ok(ValidatedRating {
        categories,
        overall,
        review: submission.review.clone(),
        anonymous: submission.anonymous,
    })
}

fn check_scale(config: &RatingConfig, field: &str, value: i32, issues: &mut Vec<ValidationIssue>) {
    if config.accepts(value) {
        return;
    }
    if value < config.min_rating {
        issues.push(
            ValidationIssue::new(field, "min", format!("rating must be at least {}", config.min_rating))
                .with_param(config.min_rating),
        );
    } else if value > config.max_rating {
        issues.push(
            ValidationIssue::new(field, "max", format!("rating must be at most {}", config.max_rating))
                .with_param(config.max_rating),
        );
    }
}
