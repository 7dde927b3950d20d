//! Query parameter parsing.
//!
//! Parses raw query parameters into a [`QueryExpressionParams`] value. The
//! recognized parameter set is closed and known at build time; unrecognized
//! names are reported as unmatched so callers can forward them untouched, a
//! deliberate forward-compatibility choice.
//!
//! Each handler is a pure fold step: it consumes the current expression value
//! and returns an updated one, or an error. Nothing is mutated in place and
//! no partial include-field set ever escapes a failed parse.

use tracing::debug;

use voxel_core::{defaults, AttributeTag, Error, QueryExpressionParams, Result, TagResolver};

/// Literal `includefield` value that selects every attribute.
const INCLUDE_FIELD_ALL: &str = "all";

/// Parser configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct QueryParserConfig {
    /// Upper bound for the `limit` parameter.
    pub max_result_count: i64,
}

impl Default for QueryParserConfig {
    fn default() -> Self {
        Self {
            max_result_count: defaults::MAX_QUERY_RESULT_COUNT,
        }
    }
}

/// The closed set of recognized query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParam {
    Offset,
    Limit,
    FuzzyMatching,
    IncludeField,
}

impl QueryParam {
    /// Case-insensitive, trimmed lookup. `None` means the parameter is not
    /// recognized, which is not an error.
    pub fn from_name(name: &str) -> Option<Self> {
        let trimmed = name.trim();
        if trimmed.eq_ignore_ascii_case("offset") {
            Some(QueryParam::Offset)
        } else if trimmed.eq_ignore_ascii_case("limit") {
            Some(QueryParam::Limit)
        } else if trimmed.eq_ignore_ascii_case("fuzzymatching") {
            Some(QueryParam::FuzzyMatching)
        } else if trimmed.eq_ignore_ascii_case("includefield") {
            Some(QueryParam::IncludeField)
        } else {
            None
        }
    }
}

/// Parses raw query parameters into a query expression.
///
/// Stateless apart from the configuration and the injected tag resolver;
/// safe to share across requests.
pub struct QueryExpressionBuilder<'a> {
    config: QueryParserConfig,
    resolver: &'a dyn TagResolver,
}

impl<'a> QueryExpressionBuilder<'a> {
    pub fn new(config: QueryParserConfig, resolver: &'a dyn TagResolver) -> Self {
        Self { config, resolver }
    }

    /// Apply one raw parameter to the expression.
    ///
    /// Returns the updated expression and whether the parameter name was
    /// recognized. Unrecognized names leave the expression untouched.
    pub fn apply(
        &self,
        name: &str,
        values: &[String],
        params: QueryExpressionParams,
    ) -> Result<(QueryExpressionParams, bool)> {
        let Some(param) = QueryParam::from_name(name) else {
            debug!(param = name, "ignoring unrecognized query parameter");
            return Ok((params, false));
        };
        let updated = match param {
            QueryParam::Offset => Self::parse_offset(values, params)?,
            QueryParam::Limit => self.parse_limit(values, params)?,
            QueryParam::FuzzyMatching => Self::parse_fuzzy_matching(values, params)?,
            QueryParam::IncludeField => self.parse_include_field(values, params)?,
        };
        Ok((updated, true))
    }

    /// Parse a full set of raw parameters, folding each through its handler.
    pub fn parse<'p, I>(&self, pairs: I) -> Result<QueryExpressionParams>
    where
        I: IntoIterator<Item = (&'p str, &'p [String])>,
    {
        let mut params = QueryExpressionParams::default();
        for (name, values) in pairs {
            let (updated, _matched) = self.apply(name, values, params)?;
            params = updated;
        }
        Ok(params)
    }

    // Only the first raw value of a scalar parameter is consulted.
    fn first_value(values: &[String]) -> &str {
        values.first().map(|v| v.trim()).unwrap_or("")
    }

    fn parse_offset(
        values: &[String],
        mut params: QueryExpressionParams,
    ) -> Result<QueryExpressionParams> {
        let raw = Self::first_value(values);
        match raw.parse::<i64>() {
            Ok(offset) if offset >= 0 => {
                params.offset = offset;
                Ok(params)
            }
            _ => Err(Error::InvalidOffset(raw.to_string())),
        }
    }

    fn parse_limit(
        &self,
        values: &[String],
        mut params: QueryExpressionParams,
    ) -> Result<QueryExpressionParams> {
        let raw = Self::first_value(values);
        let limit: i64 = raw
            .parse()
            .map_err(|_| Error::InvalidInput(format!("invalid limit value: {raw}")))?;
        if limit < 1 || limit > self.config.max_result_count {
            return Err(Error::LimitOutOfRange {
                value: limit,
                max: self.config.max_result_count,
            });
        }
        params.limit = limit;
        Ok(params)
    }

    fn parse_fuzzy_matching(
        values: &[String],
        mut params: QueryExpressionParams,
    ) -> Result<QueryExpressionParams> {
        let raw = Self::first_value(values);
        if raw.eq_ignore_ascii_case("true") {
            params.fuzzy_match = true;
        } else if raw.eq_ignore_ascii_case("false") {
            params.fuzzy_match = false;
        } else {
            return Err(Error::InvalidBoolean(raw.to_string()));
        }
        Ok(params)
    }

    fn parse_include_field(
        &self,
        values: &[String],
        mut params: QueryExpressionParams,
    ) -> Result<QueryExpressionParams> {
        // `all` anywhere among the supplied tokens overrides the whole
        // parameter; co-occurring tokens are not validated.
        if values
            .iter()
            .flat_map(|v| v.split(','))
            .any(|v| v.trim().eq_ignore_ascii_case(INCLUDE_FIELD_ALL))
        {
            params.include_all = true;
            return Ok(params);
        }

        let mut fields = params.include_fields;
        for value in values {
            for token in value.split(',') {
                let trimmed = token.trim();
                let tag = self
                    .resolve_token(trimmed)
                    .ok_or_else(|| Error::UnknownAttribute(trimmed.to_string()))?;
                if !fields.contains(&tag) {
                    fields.push(tag);
                }
            }
        }
        params.include_fields = fields;
        Ok(params)
    }

    fn resolve_token(&self, token: &str) -> Option<AttributeTag> {
        self.resolver.resolve(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::StandardTagResolver;

    fn builder(resolver: &StandardTagResolver) -> QueryExpressionBuilder<'_> {
        QueryExpressionBuilder::new(QueryParserConfig::default(), resolver)
    }

    fn vals(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_unknown_parameter_is_unmatched_not_error() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let (params, matched) = b
            .apply("somethingelse", &vals(&["1"]), QueryExpressionParams::default())
            .unwrap();
        assert!(!matched);
        assert_eq!(params, QueryExpressionParams::default());
    }

    #[test]
    fn test_parameter_names_are_case_insensitive_and_trimmed() {
        assert_eq!(QueryParam::from_name("OFFSET"), Some(QueryParam::Offset));
        assert_eq!(QueryParam::from_name(" limit "), Some(QueryParam::Limit));
        assert_eq!(
            QueryParam::from_name("FuzzyMatching"),
            Some(QueryParam::FuzzyMatching)
        );
        assert_eq!(
            QueryParam::from_name("IncludeField"),
            Some(QueryParam::IncludeField)
        );
        assert_eq!(QueryParam::from_name("includefields"), None);
    }

    #[test]
    fn test_offset_parses_non_negative() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let (params, matched) = b
            .apply("offset", &vals(&["25"]), QueryExpressionParams::default())
            .unwrap();
        assert!(matched);
        assert_eq!(params.offset, 25);
    }

    #[test]
    fn test_negative_offset_is_validation_error_not_clamped() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let err = b
            .apply("offset", &vals(&["-1"]), QueryExpressionParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOffset(ref v) if v == "-1"));
    }

    #[test]
    fn test_non_numeric_offset_rejected() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let err = b
            .apply("offset", &vals(&["abc"]), QueryExpressionParams::default())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_limit_above_max_cites_bounds() {
        let resolver = StandardTagResolver::new();
        let b = QueryExpressionBuilder::new(
            QueryParserConfig {
                max_result_count: 200,
            },
            &resolver,
        );
        let err = b
            .apply("limit", &vals(&["500"]), QueryExpressionParams::default())
            .unwrap_err();
        match err {
            Error::LimitOutOfRange { value, max } => {
                assert_eq!(value, 500);
                assert_eq!(max, 200);
            }
            other => panic!("expected LimitOutOfRange, got {other:?}"),
        }
        let msg = Error::LimitOutOfRange {
            value: 500,
            max: 200,
        }
        .to_string();
        assert!(msg.contains("between 1 and 200"));
    }

    #[test]
    fn test_limit_zero_rejected() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let err = b
            .apply("limit", &vals(&["0"]), QueryExpressionParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::LimitOutOfRange { value: 0, .. }));
    }

    #[test]
    fn test_limit_within_bounds_accepted() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let (params, _) = b
            .apply("limit", &vals(&["50"]), QueryExpressionParams::default())
            .unwrap();
        assert_eq!(params.limit, 50);
    }

    #[test]
    fn test_fuzzy_matching_parses_bool_case_insensitively() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let (params, _) = b
            .apply(
                "fuzzymatching",
                &vals(&["True"]),
                QueryExpressionParams::default(),
            )
            .unwrap();
        assert!(params.fuzzy_match);

        let err = b
            .apply(
                "fuzzymatching",
                &vals(&["maybe"]),
                QueryExpressionParams::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBoolean(ref v) if v == "maybe"));
    }

    #[test]
    fn test_first_occurrence_wins_for_scalar_parameters() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let (params, _) = b
            .apply(
                "offset",
                &vals(&["7", "99"]),
                QueryExpressionParams::default(),
            )
            .unwrap();
        assert_eq!(params.offset, 7);
    }

    #[test]
    fn test_include_field_all_overrides_other_tokens() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        // The extra tokens are not validated once `all` is seen, even when
        // they would not resolve on their own.
        let (params, _) = b
            .apply(
                "includefield",
                &vals(&["all,StudyDate", "NotATag"]),
                QueryExpressionParams::default(),
            )
            .unwrap();
        assert!(params.include_all);
        assert!(params.include_fields.is_empty());

        let (params, _) = b
            .apply(
                "includefield",
                &vals(&[" ALL "]),
                QueryExpressionParams::default(),
            )
            .unwrap();
        assert!(params.include_all);
    }

    #[test]
    fn test_include_field_splits_commas_and_resolves() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let (params, _) = b
            .apply(
                "includefield",
                &vals(&["StudyDate, Modality", "00100010"]),
                QueryExpressionParams::default(),
            )
            .unwrap();
        assert_eq!(
            params.include_fields,
            vec![
                AttributeTag::new(0x0008, 0x0020),
                AttributeTag::new(0x0008, 0x0060),
                AttributeTag::new(0x0010, 0x0010),
            ]
        );
        assert!(!params.include_all);
    }

    #[test]
    fn test_include_field_unknown_token_aborts_whole_parse() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let err = b
            .apply(
                "includefield",
                &vals(&["StudyDate,Bogus,Modality"]),
                QueryExpressionParams::default(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute(ref t) if t == "Bogus"));
    }

    #[test]
    fn test_include_field_deduplicates() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let (params, _) = b
            .apply(
                "includefield",
                &vals(&["StudyDate,00080020"]),
                QueryExpressionParams::default(),
            )
            .unwrap();
        assert_eq!(params.include_fields.len(), 1);
    }

    #[test]
    fn test_parse_folds_full_parameter_set() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let offset = vals(&["10"]);
        let limit = vals(&["25"]);
        let fuzzy = vals(&["true"]);
        let include = vals(&["Modality"]);
        let unknown = vals(&["whatever"]);
        let pairs: Vec<(&str, &[String])> = vec![
            ("offset", &offset),
            ("limit", &limit),
            ("fuzzymatching", &fuzzy),
            ("includefield", &include),
            ("x-custom", &unknown),
        ];
        let params = b.parse(pairs).unwrap();
        assert_eq!(params.offset, 10);
        assert_eq!(params.limit, 25);
        assert!(params.fuzzy_match);
        assert_eq!(params.include_fields, vec![AttributeTag::new(0x0008, 0x0060)]);
    }

    #[test]
    fn test_parse_failure_leaves_no_partial_include_set() {
        let resolver = StandardTagResolver::new();
        let b = builder(&resolver);
        let include = vals(&["StudyDate,Bogus"]);
        let pairs: Vec<(&str, &[String])> = vec![("includefield", &include)];
        assert!(b.parse(pairs).is_err());
    }
}
