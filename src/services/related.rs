//! Related-article ranking
//!
//! Candidates are narrowed by an aggregate query in the repository; this
//! module finishes the ranking in memory:
//!
//! 1. drop the source article, unlisted articles and candidates sharing no tag
//! 2. sort by shared-tag count, then by publication time (newest first)
//! 3. truncate to the display limit
//!
//! The sort is stable, so candidates tied on both keys keep their input order.

use serde::Serialize;
use std::cmp::Reverse;

use crate::models::Article;

/// Number of related articles shown under an article
pub const DEFAULT_DISPLAY_LIMIT: usize = 4;

/// Upper bound on candidates gathered before ranking
pub const DEFAULT_CANDIDATE_CAP: usize = 100;

/// An article together with the number of tags it shares with the source
#[derive(Debug, Clone, Serialize)]
pub struct RelatedArticle {
    #[serde(flatten)]
    pub article: Article,
    pub matching_tags: usize,
}

/// Rank `candidates` by relevance to `source`.
///
/// A source without tags yields an empty list.
pub fn rank_related<I>(source: &Article, candidates: I, limit: usize) -> Vec<RelatedArticle>
where
    I: IntoIterator<Item = Article>,
{
    let source_tags = source.tag_ids();
    if source_tags.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<RelatedArticle> = candidates
        .into_iter()
        .filter(|candidate| candidate.id != source.id && candidate.is_public())
        .filter_map(|candidate| {
            let matching_tags = candidate.tag_ids().intersection(&source_tags).count();
            (matching_tags > 0).then_some(RelatedArticle {
                article: candidate,
                matching_tags,
            })
        })
        .collect();

    ranked.sort_by_key(|r| (Reverse(r.matching_tags), Reverse(r.article.published_timestamp())));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Tag;
    use chrono::{TimeZone, Utc};

    fn tag(id: i64) -> Tag {
        Tag {
            id,
            ..Tag::new(format!("t{}", id), format!("T{}", id))
        }
    }

    fn article(id: i64, tags: &[i64], published_day: Option<u32>) -> Article {
        let now = Utc::now();
        Article {
            id,
            document_id: format!("doc-{}", id),
            slug: format!("a-{}", id),
            title: format!("Article {}", id),
            desc: None,
            content: String::new(),
            tags: tags.iter().copied().map(tag).collect(),
            featured_image: None,
            unlisted: false,
            commentable: true,
            published_at: published_day
                .map(|d| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()),
            created_at: now,
            updated_at: now,
        }
    }

    fn ids(ranked: &[RelatedArticle]) -> Vec<i64> {
        ranked.iter().map(|r| r.article.id).collect()
    }

    #[test]
    fn test_ranks_by_matching_then_recency() {
        let source = article(1, &[10, 20, 30], Some(1));
        let pool = vec![
            article(2, &[10], Some(20)),
            article(3, &[10, 20], Some(5)),
            article(4, &[10, 20], Some(9)),
            article(5, &[10, 20, 30], Some(2)),
        ];

        let ranked = rank_related(&source, pool, 10);

        assert_eq!(ids(&ranked), vec![5, 4, 3, 2]);
        assert_eq!(ranked[0].matching_tags, 3);
        assert_eq!(ranked[3].matching_tags, 1);
    }

    #[test]
    fn test_excludes_source_unlisted_and_unrelated() {
        let source = article(1, &[10], Some(1));
        let mut hidden = article(3, &[10], Some(3));
        hidden.unlisted = true;
        let pool = vec![
            source.clone(),
            article(2, &[10], Some(2)),
            hidden,
            article(4, &[99], Some(4)),
        ];

        assert_eq!(ids(&rank_related(&source, pool, 10)), vec![2]);
    }

    #[test]
    fn test_unpublished_sorts_as_oldest() {
        let source = article(1, &[10], None);
        let pool = vec![article(2, &[10], None), article(3, &[10], Some(1))];

        assert_eq!(ids(&rank_related(&source, pool, 10)), vec![3, 2]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let source = article(1, &[10], None);
        let pool = vec![
            article(7, &[10], Some(3)),
            article(5, &[10], Some(3)),
            article(6, &[10], Some(3)),
        ];

        assert_eq!(ids(&rank_related(&source, pool, 10)), vec![7, 5, 6]);
    }

    #[test]
    fn test_truncates_to_limit() {
        let source = article(1, &[10], None);
        let pool: Vec<Article> = (2..20).map(|id| article(id, &[10], Some(1))).collect();

        assert_eq!(rank_related(&source, pool.clone(), DEFAULT_DISPLAY_LIMIT).len(), 4);
        assert!(rank_related(&source, pool, 0).is_empty());
    }

    #[test]
    fn test_source_without_tags_yields_empty() {
        let source = article(1, &[], None);
        let pool = vec![article(2, &[10], None)];

        assert!(rank_related(&source, pool, 4).is_empty());
        assert!(rank_related(&article(1, &[10], None), Vec::new(), 4).is_empty());
    }

    #[test]
    fn test_serializes_matching_count_inline() {
        let source = article(1, &[10], None);
        let ranked = rank_related(&source, vec![article(2, &[10], None)], 4);
        let json = serde_json::to_value(&ranked[0]).unwrap();

        assert_eq!(json["slug"], "a-2");
        assert_eq!(json["matching_tags"], 1);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn candidate_strategy() -> impl Strategy<Value = Article> {
            (
                1i64..40,
                proptest::collection::vec(1i64..8, 0..5),
                proptest::option::of(1u32..28),
                proptest::bool::weighted(0.2),
            )
                .prop_map(|(id, tags, day, unlisted)| {
                    let mut a = article(id, &tags, day);
                    a.unlisted = unlisted;
                    a
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn ranking_respects_exclusions_order_and_limit(
                source_tags in proptest::collection::vec(1i64..8, 0..4),
                pool in proptest::collection::vec(candidate_strategy(), 0..30),
                limit in 0usize..10,
            ) {
                let source = article(1, &source_tags, Some(1));
                let source_ids = source.tag_ids();
                let ranked = rank_related(&source, pool, limit);

                prop_assert!(ranked.len() <= limit);

                for r in &ranked {
                    prop_assert_ne!(r.article.id, source.id);
                    prop_assert!(!r.article.unlisted);
                    prop_assert!(r.matching_tags >= 1);
                    prop_assert_eq!(
                        r.matching_tags,
                        r.article.tag_ids().intersection(&source_ids).count()
                    );
                }

                for pair in ranked.windows(2) {
                    let (x, y) = (&pair[0], &pair[1]);
                    prop_assert!(
                        x.matching_tags > y.matching_tags
                            || (x.matching_tags == y.matching_tags
                                && x.article.published_timestamp() >= y.article.published_timestamp())
                    );
                }
            }
        }
    }
}
