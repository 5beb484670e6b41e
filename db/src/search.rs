use serde::Deserialize;
use std::cmp::Ordering;

use crate::models::{Instructor, Transmission};

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Relevance,
    Price,
    Rating,
    Name,
}

impl Default for SortBy {
    fn default() -> Self {
        Self::Relevance
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SearchQuery {
    pub query: Option<String>,
    #[serde(default)]
    pub verified_only: bool,
    pub transmission: Option<Transmission>,
    #[serde(default)]
    pub sort: SortBy,
}

/// Filters the directory for the student search view. Only active instructors are returned, and
/// the sort is stable so that ties keep the collection order.
pub fn search<'a>(
    instructors: impl Iterator<Item = &'a Instructor>,
    request: &SearchQuery,
) -> Vec<&'a Instructor> {
    let mut matches_query = contains_query(request.query.as_deref(), searchable_text);

    let mut results: Vec<&Instructor> = instructors
        .filter(|i| i.is_active())
        .filter(|i| !request.verified_only || i.verified)
        .filter(|i| match &request.transmission {
            Some(transmission) => transmission.matches(&i.car_type),
            None => true,
        })
        .filter(|i| matches_query(i))
        .collect();

    match request.sort {
        SortBy::Relevance => {}
        SortBy::Price => results.sort_by_key(|i| i.price_per_hour),
        SortBy::Rating => {
            results.sort_by(|a, b| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal))
        }
        SortBy::Name => results.sort_by_cached_key(|i| i.name.to_lowercase()),
    }

    results
}

fn searchable_text(instructor: &Instructor) -> Vec<String> {
    vec![
        instructor.name.clone(),
        instructor.address.clone(),
        instructor.city.clone(),
        instructor.languages.join(" "),
    ]
}

/// Returns a function to be used as a filter that checks if the provided query is contained in
/// any of the object strings.
fn contains_query<T, F>(query: Option<&str>, properties: F) -> impl FnMut(&&T) -> bool
where
    F: Fn(&T) -> Vec<String>,
{
    let query = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_lowercase);

    move |object: &&T| {
        if let Some(query) = &query {
            properties(object)
                .iter()
                .any(|property| property.to_lowercase().contains(query.as_str()))
        } else {
            true
        }
    }
}
