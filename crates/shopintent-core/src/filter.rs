//! Filter predicate engine.
//!
//! A [`FilterConfig`] holds eight independent clauses. Each clause is either
//! unset (`None`, matches every session) or a set of accepted values. Clauses
//! combine with AND. A set clause with no values matches nothing, which is
//! how callers express "exclude everything" without a sentinel.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::session::{Month, PageType, SessionRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterConfig {
    pub months: Option<BTreeSet<Month>>,
    pub visitor_types: Option<BTreeSet<String>>,
    pub weekend: Option<bool>,
    pub browsers: Option<BTreeSet<u16>>,
    pub operating_systems: Option<BTreeSet<u16>>,
    pub regions: Option<BTreeSet<u16>>,
    pub traffic_types: Option<BTreeSet<u16>>,
    /// Session passes when it viewed at least one page of any listed type.
    pub page_types: Option<BTreeSet<PageType>>,
}

impl FilterConfig {
    /// `true` when every clause is unset.
    pub fn is_unfiltered(&self) -> bool {
        *self == FilterConfig::default()
    }

    /// Reject configurations that cannot be meaningfully evaluated.
    ///
    /// Dimension codes start at 1 and visitor-type labels must be non-blank.
    /// Empty sets are valid: they select no sessions.
    pub fn validate(&self) -> Result<(), CoreError> {
        let code_clauses = [
            ("browsers", &self.browsers),
            ("os", &self.operating_systems),
            ("regions", &self.regions),
            ("traffics", &self.traffic_types),
        ];
        for (field, clause) in code_clauses {
            if clause.as_ref().is_some_and(|codes| codes.contains(&0)) {
                return Err(CoreError::invalid_filter(
                    field,
                    "dimension codes must be positive",
                ));
            }
        }

        if let Some(types) = &self.visitor_types {
            if types.iter().any(|t| t.trim().is_empty()) {
                return Err(CoreError::invalid_filter(
                    "visitor_types",
                    "visitor type must not be blank",
                ));
            }
        }

        Ok(())
    }

    /// Whether `session` passes every set clause.
    pub fn matches(&self, session: &SessionRecord) -> bool {
        contains_opt(&self.months, session.month.as_ref())
            && contains_opt(&self.visitor_types, session.visitor_type.as_ref())
            && self.weekend.is_none_or(|w| w == session.weekend)
            && contains_opt(&self.browsers, session.browser.as_ref())
            && contains_opt(&self.operating_systems, session.operating_system.as_ref())
            && contains_opt(&self.regions, session.region.as_ref())
            && contains_opt(&self.traffic_types, session.traffic_type.as_ref())
            && self.page_type_clause().is_none_or(|types| {
                types.iter().any(|t| session.page_count(*t) > 0)
            })
    }

    /// The page-type clause as evaluated against sessions.
    ///
    /// A clause naming every page type behaves as unset, so sessions without
    /// any page views still pass it.
    pub fn page_type_clause(&self) -> Option<&BTreeSet<PageType>> {
        self.page_types
            .as_ref()
            .filter(|types| !PageType::ALL.iter().all(|t| types.contains(t)))
    }

    /// Whether the page-type clause admits `page_type`. Unset admits all.
    pub fn admits_page_type(&self, page_type: PageType) -> bool {
        self.page_types
            .as_ref()
            .is_none_or(|types| types.contains(&page_type))
    }
}

/// Unset clause → `true`; set clause → value present and a member.
fn contains_opt<T: Ord>(clause: &Option<BTreeSet<T>>, value: Option<&T>) -> bool {
    match clause {
        None => true,
        Some(set) => value.is_some_and(|v| set.contains(v)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::session;

    fn set<T: Ord + Clone>(values: &[T]) -> Option<BTreeSet<T>> {
        Some(values.iter().cloned().collect())
    }

    #[test]
    fn unset_config_matches_everything() {
        let filter = FilterConfig::default();
        assert!(filter.is_unfiltered());
        assert!(filter.matches(&session(1)));
    }

    #[test]
    fn explicit_empty_set_matches_nothing() {
        let filter = FilterConfig {
            browsers: Some(BTreeSet::new()),
            ..Default::default()
        };
        let mut s = session(1);
        s.browser = Some(1);
        assert!(!filter.matches(&s));
        assert!(filter.validate().is_ok());
    }

    #[test]
    fn null_attribute_fails_set_clause() {
        let mut s = session(1);
        s.month = None;
        s.region = None;
        let by_month = FilterConfig {
            months: set(&[Month::Mar]),
            ..Default::default()
        };
        let by_region = FilterConfig {
            regions: set(&[1, 2, 3]),
            ..Default::default()
        };
        assert!(!by_month.matches(&s));
        assert!(!by_region.matches(&s));
    }

    #[test]
    fn clauses_combine_with_and() {
        let mut s = session(1);
        s.month = Some(Month::May);
        s.weekend = true;
        s.browser = Some(2);

        let both = FilterConfig {
            months: set(&[Month::May]),
            weekend: Some(true),
            browsers: set(&[2]),
            ..Default::default()
        };
        assert!(both.matches(&s));

        let one_fails = FilterConfig {
            weekend: Some(false),
            ..both.clone()
        };
        assert!(!one_fails.matches(&s));
    }

    #[test]
    fn page_type_clause_is_a_disjunction_over_requested_types() {
        let mut s = session(1);
        s.administrative = 0;
        s.informational = 0;
        s.product_related = 3;

        let admin_or_product = FilterConfig {
            page_types: set(&[PageType::Administrative, PageType::ProductRelated]),
            ..Default::default()
        };
        let admin_only = FilterConfig {
            page_types: set(&[PageType::Administrative]),
            ..Default::default()
        };
        assert!(admin_or_product.matches(&s));
        assert!(!admin_only.matches(&s));
        assert!(admin_only.admits_page_type(PageType::Administrative));
        assert!(!admin_only.admits_page_type(PageType::Informational));
    }

    #[test]
    fn every_page_type_behaves_as_unset() {
        let no_views = session(1);
        let every_type = FilterConfig {
            page_types: set(&PageType::ALL),
            ..Default::default()
        };
        assert_eq!(every_type.page_type_clause(), None);
        assert!(every_type.matches(&no_views));

        let two_types = FilterConfig {
            page_types: set(&[PageType::Administrative, PageType::ProductRelated]),
            ..Default::default()
        };
        assert!(two_types.page_type_clause().is_some());
        assert!(!two_types.matches(&no_views));
    }

    #[test]
    fn validate_rejects_zero_codes_and_blank_visitor_types() {
        let zero_code = FilterConfig {
            traffic_types: set(&[0, 4]),
            ..Default::default()
        };
        match zero_code.validate() {
            Err(CoreError::InvalidFilter { field, .. }) => assert_eq!(field, "traffics"),
            other => panic!("expected invalid filter, got {other:?}"),
        }

        let blank = FilterConfig {
            visitor_types: set(&["  ".to_string()]),
            ..Default::default()
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn deserializes_from_json_with_page_type_labels() {
        let filter: FilterConfig = serde_json::from_str(
            r#"{
                "months": ["Mar", "Nov"],
                "visitor_types": null,
                "weekend": true,
                "browsers": [2],
                "operating_systems": null,
                "regions": [],
                "traffic_types": null,
                "page_types": ["Product Related", "admin"]
            }"#,
        )
        .expect("deserialize filter");

        assert_eq!(filter.months, set(&[Month::Mar, Month::Nov]));
        assert_eq!(filter.weekend, Some(true));
        assert_eq!(filter.regions, Some(BTreeSet::new()));
        assert_eq!(
            filter.page_types,
            set(&[PageType::Administrative, PageType::ProductRelated])
        );

        let round_trip: FilterConfig =
            serde_json::from_str(&serde_json::to_string(&filter).expect("serialize"))
                .expect("deserialize again");
        assert_eq!(round_trip, filter);

        let unknown = serde_json::from_str::<FilterConfig>(
            r#"{"months":null,"visitor_types":null,"weekend":null,"browsers":null,
                "operating_systems":null,"regions":null,"traffic_types":null,
                "page_types":["checkout"]}"#,
        );
        assert!(unknown.is_err());
    }
}
