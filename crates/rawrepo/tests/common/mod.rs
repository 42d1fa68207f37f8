//! Shared fixtures for the engine integration tests.
//!
//! A repository is described one record per line:
//!
//! - `"870970:H"` a record of agency 870970 for work `H`.
//! - `"870970:S:870970:H"` the same, with a parent edge to `870970:H`.
//! - `"191919:H:870970"` an enrichment of `870970:H`.
//! - `"300000:H:+"` an enrichment of the previously added record's agency.
//! - `"870971:A:870970:B#text/article+marcxchange"` a non-default mimetype.
//!
//! Several edges are separated by `,`. Edges are written straight into the
//! store, so fixtures may hold graphs that validation would refuse.

#![allow(dead_code)]

use std::collections::BTreeSet;

use rawrepo::{FieldOverlayMerger, RawRepo};
use rawrepo_core::types::AgencyId;
use rawrepo_core::{
    EnqueueJob, MemoryStore, MimeType, QueueRule, Record, RecordId, RecordStore, RuleFlag,
    StaticRelationHints,
};

pub type Repo = RawRepo<MemoryStore, StaticRelationHints, FieldOverlayMerger>;

pub const PROVIDER: &str = "PRO";

struct Line {
    id: RecordId,
    mimetype: MimeType,
    refers: BTreeSet<RecordId>,
    deleted: bool,
}

pub struct Fixture {
    hints: StaticRelationHints,
    lines: Vec<Line>,
    last_agency: AgencyId,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            hints: StaticRelationHints::new(vec![870970]),
            lines: Vec::new(),
            last_agency: 0,
        }
    }

    pub fn hints(mut self, agency_id: AgencyId, priority: &[AgencyId]) -> Self {
        self.hints = self.hints.with_override(agency_id, priority.to_vec());
        self
    }

    pub fn without_common(mut self, agency_id: AgencyId) -> Self {
        self.hints = self.hints.without_common(agency_id);
        self
    }

    pub fn add(mut self, line: &str) -> Self {
        let (line, mimetype) = match line.split_once('#') {
            Some((line, mimetype)) => (line, mimetype.parse().unwrap()),
            None => (line, MimeType::MarcXchange),
        };
        let mut parts = line.splitn(3, ':');
        let agency: AgencyId = parts.next().unwrap().parse().unwrap();
        let bib = parts.next().unwrap();
        let id = RecordId::new(bib, agency);

        let mut mimetype = mimetype;
        let mut refers = BTreeSet::new();
        if let Some(edges) = parts.next() {
            for edge in edges.split(',') {
                match edge.split_once(':') {
                    Some((to_agency, to_bib)) => {
                        refers.insert(RecordId::new(to_bib, to_agency.parse().unwrap()));
                    }
                    None => {
                        if mimetype == MimeType::MarcXchange {
                            mimetype = MimeType::Enrichment;
                        }
                        let to_agency = if edge == "+" {
                            self.last_agency
                        } else {
                            edge.parse().unwrap()
                        };
                        refers.insert(RecordId::new(bib, to_agency));
                    }
                }
            }
        }

        self.lines.push(Line {
            id,
            mimetype,
            refers,
            deleted: false,
        });
        self.last_agency = agency;
        self
    }

    pub fn add_deleted(mut self, line: &str) -> Self {
        let id: RecordId = {
            let (agency, bib) = line.split_once(':').unwrap();
            RecordId::new(bib, agency.parse().unwrap())
        };
        self.lines.push(Line {
            id,
            mimetype: MimeType::MarcXchange,
            refers: BTreeSet::new(),
            deleted: true,
        });
        self
    }

    pub async fn build(self) -> Repo {
        let store = MemoryStore::with_rules([
            QueueRule::new(PROVIDER, "changed", RuleFlag::Yes, RuleFlag::Any),
            QueueRule::new(PROVIDER, "leaf", RuleFlag::Any, RuleFlag::Yes),
            QueueRule::new(PROVIDER, "node", RuleFlag::Any, RuleFlag::No),
        ]);
        for line in &self.lines {
            let record = Record::new(line.id.clone())
                .with_mimetype(line.mimetype)
                .with_content(format!("001 {}\n", line.id).into_bytes())
                .with_deleted(line.deleted);
            store.put_record(&record).await.unwrap();
            if !line.refers.is_empty() {
                store.set_relations_from(&line.id, &line.refers).await.unwrap();
            }
        }
        RawRepo::new(store, self.hints, FieldOverlayMerger::default())
    }
}

/// Parse `"agency:bib"`.
pub fn id(value: &str) -> RecordId {
    let (agency, bib) = value.split_once(':').unwrap();
    RecordId::new(bib, agency.parse().unwrap())
}

/// Render jobs as `"agency:bib:CL"`, `C` for changed and `L` for leaf.
pub fn rendered(jobs: &[EnqueueJob]) -> BTreeSet<String> {
    jobs.iter()
        .map(|job| {
            format!(
                "{}:{}:{}{}",
                job.record_id.agency_id(),
                job.record_id.bibliographic_record_id(),
                if job.changed { 'C' } else { '-' },
                if job.leaf { 'L' } else { '-' },
            )
        })
        .collect()
}

/// Assert the jobs are exactly `expected`, each appearing once.
pub fn assert_jobs(jobs: &[EnqueueJob], expected: &[&str]) {
    let got = rendered(jobs);
    assert_eq!(got.len(), jobs.len(), "duplicate jobs in {:?}", got);
    let want: BTreeSet<String> = expected.iter().map(|s| s.to_string()).collect();
    assert_eq!(got, want);
}
