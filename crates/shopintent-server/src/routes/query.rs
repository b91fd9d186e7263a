use std::collections::BTreeSet;
use std::str::FromStr;

use serde::Deserialize;

use shopintent_core::filter::FilterConfig;

use crate::error::AppError;

/// Filter clauses as they arrive in the query string.
///
/// Each clause is a comma-separated list. An absent parameter leaves the
/// clause unset; a present but empty one (`browsers=`) selects nothing.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub months: Option<String>,
    pub visitor_types: Option<String>,
    pub weekend: Option<String>,
    pub browsers: Option<String>,
    pub os: Option<String>,
    pub regions: Option<String>,
    pub traffics: Option<String>,
    pub page_types: Option<String>,
}

impl FilterQuery {
    pub fn to_filter(&self) -> Result<FilterConfig, AppError> {
        Ok(FilterConfig {
            months: parse_list(self.months.as_deref(), "months")?,
            visitor_types: parse_list(self.visitor_types.as_deref(), "visitor_types")?,
            weekend: parse_optional_bool(self.weekend.as_deref(), "weekend")?,
            browsers: parse_list(self.browsers.as_deref(), "browsers")?,
            operating_systems: parse_list(self.os.as_deref(), "os")?,
            regions: parse_list(self.regions.as_deref(), "regions")?,
            traffic_types: parse_list(self.traffics.as_deref(), "traffics")?,
            page_types: parse_list(self.page_types.as_deref(), "page_types")?,
        })
    }
}

/// Split a comma list into a set. Blank items are skipped, so `""` yields
/// an empty set rather than a set holding one blank value.
pub(crate) fn parse_list<T>(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<BTreeSet<T>>, AppError>
where
    T: FromStr + Ord,
    T::Err: std::fmt::Display,
{
    let Some(raw) = value else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|e| AppError::validation(field, format!("invalid value `{item}`: {e}")))
        })
        .collect::<Result<BTreeSet<T>, AppError>>()
        .map(Some)
}

/// Comma list in request order, duplicates kept for validation downstream.
pub(crate) fn parse_ordered_list<T>(raw: &str, field: &'static str) -> Result<Vec<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<T>()
                .map_err(|e| AppError::validation(field, format!("invalid value `{item}`: {e}")))
        })
        .collect()
}

/// An empty value leaves the clause unset.
pub(crate) fn parse_optional_bool(
    value: Option<&str>,
    field: &'static str,
) -> Result<Option<bool>, AppError> {
    let Some(raw) = value else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "true" | "1" => Ok(Some(true)),
        "false" | "0" => Ok(Some(false)),
        _ => Err(AppError::validation(
            field,
            "must be one of: true, false, 1, 0",
        )),
    }
}

#[cfg(test)]
mod tests {
    use shopintent_core::session::{Month, PageType};

    use super::*;

    #[test]
    fn absent_and_empty_lists_differ() {
        assert_eq!(parse_list::<u16>(None, "browsers").expect("absent"), None);
        assert_eq!(
            parse_list::<u16>(Some(""), "browsers").expect("empty"),
            Some(BTreeSet::new())
        );
        assert_eq!(
            parse_list::<u16>(Some("3, 1,3"), "browsers").expect("codes"),
            Some([1, 3].into_iter().collect())
        );
    }

    #[test]
    fn list_items_parse_through_domain_types() {
        let months = parse_list::<Month>(Some("June,feb"), "months").expect("months");
        assert_eq!(months, Some([Month::Feb, Month::Jun].into_iter().collect()));
        let types = parse_list::<PageType>(Some("product_related"), "page_types").expect("types");
        assert_eq!(types, Some([PageType::ProductRelated].into_iter().collect()));
    }

    #[test]
    fn invalid_item_names_the_field() {
        let err = parse_list::<u16>(Some("1,x"), "regions").expect_err("invalid");
        assert!(matches!(err, AppError::Validation { field: "regions", .. }));
    }

    #[test]
    fn parse_optional_bool_accepts_common_variants() {
        assert_eq!(parse_optional_bool(Some("true"), "weekend").expect("bool"), Some(true));
        assert_eq!(parse_optional_bool(Some("0"), "weekend").expect("bool"), Some(false));
        assert_eq!(parse_optional_bool(Some(""), "weekend").expect("bool"), None);
        assert!(parse_optional_bool(Some("yes"), "weekend").is_err());
    }

    #[test]
    fn filter_query_maps_short_names() {
        let query = FilterQuery {
            os: Some("2".to_string()),
            traffics: Some(String::new()),
            ..Default::default()
        };
        let filter = query.to_filter().expect("filter");
        assert_eq!(filter.operating_systems, Some([2].into_iter().collect()));
        assert_eq!(filter.traffic_types, Some(BTreeSet::new()));
        assert_eq!(filter.browsers, None);
    }
}
