//! Change propagation.
//!
//! When a record changes, every record whose merged view or collection
//! could depend on it has to be re-queued: the agencies enriching it, the
//! agencies whose local overrides shadow it, and everything below it in the
//! hierarchy, recursively. The traversal runs as a worklist over explicit
//! visited sets, and a record reached again on its own descent path fails
//! the whole call.
//!
//! The full plan is computed before anything is enqueued, so a failing
//! lookup leaves the queue untouched.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use tracing::{info, instrument, trace};

use rawrepo_core::error::{CircularRelationError, NotFoundError, QueueError};
use rawrepo_core::types::{AgencyId, RecordId};
use rawrepo_core::{EnqueueJob, Priority, RecordMerger, RecordStore, RelationHints, Result};

use crate::RawRepo;

/// One pending step of the traversal.
#[derive(Debug)]
enum Visit {
    /// A record entered from scratch, as a change request is.
    Entry {
        id: RecordId,
        changed: bool,
        path: Vec<RecordId>,
    },
    /// A work reached through the hierarchy, for a known set of agencies.
    Scoped {
        bibliographic_record_id: String,
        seed: BTreeSet<AgencyId>,
        changed_agency: Option<AgencyId>,
        path: Vec<RecordId>,
    },
}

/// Deduplicated jobs in discovery order.
struct Plan<'a> {
    provider: &'a str,
    priority: Priority,
    jobs: Vec<EnqueueJob>,
    index: HashMap<RecordId, usize>,
}

impl<'a> Plan<'a> {
    fn new(provider: &'a str, priority: Priority) -> Self {
        Self {
            provider,
            priority,
            jobs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// A job seen twice is changed if either visit said so, and a leaf only
    /// if both did.
    fn add(&mut self, record_id: RecordId, changed: bool, leaf: bool) {
        if let Some(&i) = self.index.get(&record_id) {
            let job = &mut self.jobs[i];
            job.changed |= changed;
            job.leaf &= leaf;
            return;
        }
        self.index.insert(record_id.clone(), self.jobs.len());
        self.jobs.push(EnqueueJob {
            record_id,
            provider: self.provider.to_string(),
            changed,
            leaf,
            priority: self.priority,
        });
    }
}

/// Children of one work, split by how they relate to the affected agencies.
#[derive(Debug, Default)]
struct Children {
    direct: BTreeSet<RecordId>,
    foreign: BTreeSet<RecordId>,
    minor: BTreeSet<RecordId>,
}

impl<S, H, M> RawRepo<S, H, M>
where
    S: RecordStore,
    H: RelationHints,
    M: RecordMerger,
{
    /// Enqueue every job a change to `id` implies and return them.
    ///
    /// `priority` defaults to [`EngineConfig::default_priority`](crate::EngineConfig).
    #[instrument(skip(self))]
    pub async fn changed_record(
        &self,
        provider: &str,
        id: &RecordId,
        priority: Option<Priority>,
    ) -> Result<Vec<EnqueueJob>> {
        self.ensure_provider(provider).await?;
        let jobs = self.plan_changed_record(provider, id, priority).await?;
        for job in &jobs {
            self.enqueue_unchecked(job).await?;
        }
        info!(jobs = jobs.len(), "Propagated change");
        Ok(jobs)
    }

    /// The jobs a change to `id` implies, without enqueuing them.
    pub async fn plan_changed_record(
        &self,
        provider: &str,
        id: &RecordId,
        priority: Option<Priority>,
    ) -> Result<Vec<EnqueueJob>> {
        let mut plan = Plan::new(provider, priority.unwrap_or(self.config.default_priority));
        let mut processed: HashSet<(String, BTreeSet<AgencyId>)> = HashSet::new();
        let mut work = VecDeque::from([Visit::Entry {
            id: id.clone(),
            changed: true,
            path: Vec::new(),
        }]);

        while let Some(visit) = work.pop_front() {
            match visit {
                Visit::Entry { id, changed, path } => {
                    let bib = id.bibliographic_record_id();
                    if self.record_exists(bib, id.agency_id()).await? {
                        work.push_back(Visit::Scoped {
                            bibliographic_record_id: bib.to_string(),
                            seed: BTreeSet::from([id.agency_id()]),
                            changed_agency: changed.then_some(id.agency_id()),
                            path,
                        });
                    } else if self.record_exists_maybe_deleted(bib, id.agency_id()).await?
                        || self.hints.uses_common_agency(id.agency_id()).await?
                    {
                        trace!(record = %id, "Queued as leaf, no live record");
                        plan.add(id, changed, true);
                    } else {
                        return Err(NotFoundError::Record { id }.into());
                    }
                }
                Visit::Scoped {
                    bibliographic_record_id,
                    seed,
                    changed_agency,
                    path,
                } => {
                    if !processed.insert((bibliographic_record_id.clone(), seed.clone())) {
                        continue;
                    }
                    let next = self
                        .visit_work(&mut plan, &bibliographic_record_id, &seed, changed_agency, &path)
                        .await?;
                    work.extend(next);
                }
            }
        }

        Ok(plan.jobs)
    }

    /// Plan the jobs for one work and return the visits below it.
    async fn visit_work(
        &self,
        plan: &mut Plan<'_>,
        bib: &str,
        seed: &BTreeSet<AgencyId>,
        changed_agency: Option<AgencyId>,
        path: &[RecordId],
    ) -> Result<Vec<Visit>> {
        let affected = self.affected_agencies(bib, seed).await?;
        let search = self.search_agencies(bib, &affected).await?;
        let children = self.partition_children(bib, &affected, &search).await?;

        let leaf = children.direct.is_empty() && children.minor.is_empty();
        for &agency in &affected {
            plan.add(
                RecordId::new(bib, agency),
                changed_agency == Some(agency),
                leaf,
            );
        }
        trace!(
            bib,
            affected = ?affected,
            direct = children.direct.len(),
            foreign = children.foreign.len(),
            minor = children.minor.len(),
            "Visited work"
        );

        let here = RecordId::new(bib, seed.iter().next().copied().unwrap_or_default());
        let mut below = path.to_vec();
        below.push(here);

        let mut by_work: BTreeMap<String, BTreeSet<AgencyId>> = BTreeMap::new();
        for child in children.direct.iter().chain(children.minor.iter()) {
            by_work
                .entry(child.bibliographic_record_id().to_string())
                .or_default()
                .insert(child.agency_id());
        }

        let mut next = Vec::with_capacity(by_work.len() + children.foreign.len());
        for (child_bib, agencies) in by_work {
            let first = agencies.iter().next().copied().unwrap_or_default();
            check_descent(&below, &RecordId::new(child_bib.as_str(), first))?;
            next.push(Visit::Scoped {
                bibliographic_record_id: child_bib,
                seed: agencies,
                changed_agency: None,
                path: below.clone(),
            });
        }
        for child in children.foreign {
            check_descent(&below, &child)?;
            next.push(Visit::Entry {
                id: child,
                changed: false,
                path: below.clone(),
            });
        }
        Ok(next)
    }

    /// The seed agencies plus every agency enriching the work, either
    /// directly or through an enrichment of one of its ancestors.
    async fn affected_agencies(
        &self,
        bib: &str,
        seed: &BTreeSet<AgencyId>,
    ) -> Result<BTreeSet<AgencyId>> {
        let mut affected = seed.clone();
        self.add_minor_siblings(bib, &mut affected).await?;

        let mut visited = HashSet::from([bib.to_string()]);
        let mut ancestors = VecDeque::from([bib.to_string()]);
        while let Some(current) = ancestors.pop_front() {
            if current != bib {
                self.add_minor_siblings(&current, &mut affected).await?;
            }

            let agencies: Vec<AgencyId> = affected.iter().copied().collect();
            for agency in agencies {
                let parent_agency = match self.find_parent_relation_agency(&current, agency).await {
                    Ok(parent_agency) => parent_agency,
                    Err(e) if e.is_not_found() => continue,
                    Err(e) => return Err(e),
                };
                let holder = RecordId::new(current.as_str(), parent_agency);
                for parent in self.chain_parents(&holder).await? {
                    if visited.insert(parent.bibliographic_record_id().to_string()) {
                        ancestors.push_back(parent.bibliographic_record_id().to_string());
                    }
                }
            }
        }

        self.add_minor_siblings(bib, &mut affected).await?;
        Ok(affected)
    }

    /// Close `agencies` over siblings-to-me edges of `bib`.
    async fn add_minor_siblings(&self, bib: &str, agencies: &mut BTreeSet<AgencyId>) -> Result<()> {
        let mut frontier: VecDeque<AgencyId> = agencies.iter().copied().collect();
        while let Some(agency) = frontier.pop_front() {
            let id = RecordId::new(bib, agency);
            for sibling in self.store.get_relations_siblings_to_me(&id).await? {
                if agencies.insert(sibling.agency_id()) {
                    frontier.push_back(sibling.agency_id());
                }
            }
        }
        Ok(())
    }

    /// Agencies whose records may carry children the affected agencies see.
    async fn search_agencies(
        &self,
        bib: &str,
        affected: &BTreeSet<AgencyId>,
    ) -> Result<BTreeSet<AgencyId>> {
        let mut search = BTreeSet::new();
        for &agency in affected {
            let start = if self.record_exists(bib, agency).await? {
                agency
            } else {
                match self.find_sibling_relation_agency(bib, agency).await {
                    Ok(found) => found,
                    Err(e) if e.is_not_found() => continue,
                    Err(e) => return Err(e),
                }
            };
            for link in self.sibling_chain(&RecordId::new(bib, start)).await? {
                search.insert(link.agency_id());
            }
        }
        Ok(search)
    }

    async fn partition_children(
        &self,
        bib: &str,
        affected: &BTreeSet<AgencyId>,
        search: &BTreeSet<AgencyId>,
    ) -> Result<Children> {
        let mut children = Children::default();
        for &source in search {
            if !self.record_exists(bib, source).await? {
                continue;
            }
            let id = RecordId::new(bib, source);
            for child in self.store.get_relations_children(&id).await? {
                if affected.contains(&child.agency_id()) {
                    children.direct.insert(child);
                } else if child.agency_id() != source {
                    children.foreign.insert(child);
                } else {
                    // Inherited by every agency enriching this work.
                    for &agency in affected {
                        children.minor.insert(child.with_agency(agency));
                    }
                }
            }
        }

        let claimed: BTreeSet<AgencyId> = children
            .direct
            .iter()
            .chain(children.foreign.iter())
            .map(RecordId::agency_id)
            .collect();
        children
            .minor
            .retain(|child| !claimed.contains(&child.agency_id()));
        Ok(children)
    }

    pub(crate) async fn ensure_provider(&self, provider: &str) -> Result<()> {
        if self.store.check_provider(provider).await? {
            Ok(())
        } else {
            Err(QueueError::UnknownProvider {
                provider: provider.to_string(),
            }
            .into())
        }
    }
}

fn check_descent(path: &[RecordId], child: &RecordId) -> Result<()> {
    if path.iter().any(|seen| seen.same_work(child)) {
        let mut loop_path = path.to_vec();
        loop_path.push(child.clone());
        return Err(CircularRelationError { path: loop_path }.into());
    }
    Ok(())
}
