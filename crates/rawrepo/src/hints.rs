//! Caching wrapper for relation hints.
//!
//! Agency rules change rarely and the service answering them is remote, so
//! answers are kept per agency for a fixed time. When the service fails the
//! last answer is served even if stale, and agencies never seen before get
//! the static fallback table.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::{trace, warn};

use rawrepo_core::types::AgencyId;
use rawrepo_core::{RelationHints, Result, StaticRelationHints};

#[derive(Clone, Debug)]
struct Answer {
    uses_common_agency: bool,
    agency_priority: Vec<AgencyId>,
    fetched_at: DateTime<Utc>,
}

pub struct CachedRelationHints<H> {
    inner: H,
    fallback: StaticRelationHints,
    ttl: Duration,
    answers: RwLock<HashMap<AgencyId, Answer>>,
}

impl<H: RelationHints> CachedRelationHints<H> {
    pub fn new(inner: H, ttl: Duration) -> Self {
        Self::with_fallback(inner, ttl, StaticRelationHints::fallback())
    }

    pub fn with_fallback(inner: H, ttl: Duration, fallback: StaticRelationHints) -> Self {
        Self {
            inner,
            fallback,
            ttl,
            answers: RwLock::new(HashMap::new()),
        }
    }

    async fn lookup(&self, agency_id: AgencyId) -> Result<Answer> {
        let now = Utc::now();
        let cached = self.answers.read().await.get(&agency_id).cloned();
        if let Some(answer) = &cached
            && now - answer.fetched_at < self.ttl
        {
            return Ok(answer.clone());
        }

        match self.fetch(agency_id).await {
            Ok(answer) => {
                trace!(agency_id, "Refreshed relation hints");
                self.answers.write().await.insert(agency_id, answer.clone());
                Ok(answer)
            }
            Err(e) => match cached {
                Some(stale) => {
                    warn!(agency_id, error = %e, "Relation hints unavailable, serving stale answer");
                    Ok(stale)
                }
                None => {
                    warn!(agency_id, error = %e, "Relation hints unavailable, using fallback table");
                    Ok(Answer {
                        uses_common_agency: self.fallback.uses_common_agency(agency_id).await?,
                        agency_priority: self.fallback.agency_priority(agency_id).await?,
                        fetched_at: now,
                    })
                }
            },
        }
    }

    async fn fetch(&self, agency_id: AgencyId) -> Result<Answer> {
        Ok(Answer {
            uses_common_agency: self.inner.uses_common_agency(agency_id).await?,
            agency_priority: self.inner.agency_priority(agency_id).await?,
            fetched_at: Utc::now(),
        })
    }
}

#[async_trait]
impl<H: RelationHints> RelationHints for CachedRelationHints<H> {
    async fn uses_common_agency(&self, agency_id: AgencyId) -> Result<bool> {
        Ok(self.lookup(agency_id).await?.uses_common_agency)
    }

    async fn agency_priority(&self, agency_id: AgencyId) -> Result<Vec<AgencyId>> {
        Ok(self.lookup(agency_id).await?.agency_priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use rawrepo_core::error::{Error, StoreError};

    #[derive(Default)]
    struct Flaky {
        calls: AtomicUsize,
        down: AtomicBool,
    }

    #[async_trait]
    impl RelationHints for Flaky {
        async fn uses_common_agency(&self, _agency_id: AgencyId) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.down.load(Ordering::SeqCst) {
                return Err(Error::Store(StoreError::Io {
                    message: "connection refused".to_string(),
                }));
            }
            Ok(true)
        }

        async fn agency_priority(&self, agency_id: AgencyId) -> Result<Vec<AgencyId>> {
            Ok(vec![agency_id, 999999])
        }
    }

    #[tokio::test]
    async fn test_answers_are_cached() {
        let hints = CachedRelationHints::new(Flaky::default(), Duration::minutes(5));
        assert_eq!(hints.agency_priority(1).await.unwrap(), vec![1, 999999]);
        assert!(hints.uses_common_agency(1).await.unwrap());
        assert_eq!(hints.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_answer_served_when_down() {
        let hints = CachedRelationHints::new(Flaky::default(), Duration::zero());
        assert_eq!(hints.agency_priority(1).await.unwrap(), vec![1, 999999]);

        hints.inner.down.store(true, Ordering::SeqCst);
        assert_eq!(hints.agency_priority(1).await.unwrap(), vec![1, 999999]);
    }

    #[tokio::test]
    async fn test_fallback_for_unknown_agency_when_down() {
        let flaky = Flaky::default();
        flaky.down.store(true, Ordering::SeqCst);
        let hints = CachedRelationHints::with_fallback(
            flaky,
            Duration::minutes(5),
            StaticRelationHints::new(vec![870970]),
        );
        assert_eq!(hints.agency_priority(191919).await.unwrap(), vec![191919, 870970]);
    }
}
