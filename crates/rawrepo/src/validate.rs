//! Relation topology validation.
//!
//! Which outbound relations a record may have depends on its mimetype. The
//! rules only run when a relation set is replaced, never on read.

use std::collections::BTreeSet;

use tracing::debug;

use rawrepo_core::Result;
use rawrepo_core::error::{ValidationError, ValidationViolation};
use rawrepo_core::types::{MimeType, RecordId};
use rawrepo_core::{RecordMerger, RecordStore, RelationHints};

use crate::RawRepo;

impl<S, H, M> RawRepo<S, H, M>
where
    S: RecordStore,
    H: RelationHints,
    M: RecordMerger,
{
    /// Check a proposed outbound relation set against the record's current
    /// mimetype and the mimetypes of every target.
    ///
    /// # Errors
    ///
    /// `Validation` when a rule is broken; `NotFound` when the record or a
    /// target doesn't exist.
    pub async fn validate_relations(&self, id: &RecordId, refers: &BTreeSet<RecordId>) -> Result<()> {
        if refers.contains(id) {
            return Err(reject(id, ValidationViolation::SelfRelation));
        }
        if refers.is_empty() {
            return Ok(());
        }

        let mimetype = self
            .get_mimetype_of(id.bibliographic_record_id(), id.agency_id())
            .await?;

        let mut targets = Vec::with_capacity(refers.len());
        for target in refers {
            let target_mimetype = self
                .get_mimetype_of(target.bibliographic_record_id(), target.agency_id())
                .await?;
            targets.push((target.clone(), target_mimetype));
        }

        check_relations(id, mimetype, &targets).map_err(|violation| {
            debug!(record = %id, %violation, "Rejected relations");
            reject(id, violation)
        })
    }
}

fn reject(id: &RecordId, violation: ValidationViolation) -> rawrepo_core::Error {
    ValidationError {
        id: id.clone(),
        violation,
    }
    .into()
}

/// The per-mimetype rule table.
pub fn check_relations(
    id: &RecordId,
    mimetype: MimeType,
    targets: &[(RecordId, MimeType)],
) -> std::result::Result<(), ValidationViolation> {
    let (siblings, parents): (Vec<_>, Vec<_>) =
        targets.iter().partition(|(target, _)| target.same_work(id));
    let hierarchy: Vec<_> = parents
        .iter()
        .filter(|(_, m)| *m != MimeType::Authority)
        .collect();

    match mimetype {
        MimeType::MarcXchange | MimeType::Article | MimeType::LitAnalysis => {
            if !siblings.is_empty() {
                return Err(ValidationViolation::SiblingForbidden { mimetype });
            }
            if hierarchy.len() > 1 {
                return Err(ValidationViolation::TooManyParents {
                    found: hierarchy.len(),
                });
            }
        }
        MimeType::Authority => {
            if !targets.is_empty() {
                return Err(ValidationViolation::AuthorityRelations);
            }
        }
        MimeType::MatVurd => {
            if !siblings.is_empty() {
                return Err(ValidationViolation::SiblingForbidden { mimetype });
            }
            if let Some((target, m)) = parents.iter().find(|(_, m)| *m != MimeType::MarcXchange) {
                return Err(ValidationViolation::InvalidParentMimetype {
                    target: target.clone(),
                    mimetype: *m,
                });
            }
        }
        MimeType::Enrichment => {
            if siblings.len() > 1 {
                return Err(ValidationViolation::TooManySiblings {
                    found: siblings.len(),
                });
            }
            if let Some((target, m)) = siblings.first() {
                if *m == MimeType::Unknown {
                    return Err(ValidationViolation::InvalidSiblingMimetype {
                        target: target.clone(),
                        mimetype: *m,
                    });
                }
                if let Some((parent, _)) = hierarchy.first() {
                    return Err(ValidationViolation::ParentBesideSibling {
                        target: parent.clone(),
                    });
                }
            } else if hierarchy.len() > 1 {
                return Err(ValidationViolation::TooManyParents {
                    found: hierarchy.len(),
                });
            }
        }
        MimeType::HostPub | MimeType::Simple | MimeType::Unknown => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(bib: &str, agency: u32) -> RecordId {
        RecordId::new(bib, agency)
    }

    #[test]
    fn test_authority_has_no_outbound() {
        let me = id("a", 870979);
        assert_eq!(
            check_relations(&me, MimeType::Authority, &[(id("b", 870979), MimeType::Authority)]),
            Err(ValidationViolation::AuthorityRelations)
        );
        assert!(check_relations(&me, MimeType::Authority, &[]).is_ok());
    }

    #[test]
    fn test_enrichment_single_sibling() {
        let me = id("b", 191919);
        let two = [
            (id("b", 870970), MimeType::MarcXchange),
            (id("b", 870971), MimeType::Article),
        ];
        assert_eq!(
            check_relations(&me, MimeType::Enrichment, &two),
            Err(ValidationViolation::TooManySiblings { found: 2 })
        );

        let one = [
            (id("b", 870970), MimeType::MarcXchange),
            (id("aut", 870979), MimeType::Authority),
        ];
        assert!(check_relations(&me, MimeType::Enrichment, &one).is_ok());
    }

    #[test]
    fn test_enrichment_parent_rules() {
        let me = id("b", 191919);
        let beside = [
            (id("b", 870970), MimeType::MarcXchange),
            (id("h", 870970), MimeType::MarcXchange),
        ];
        assert!(matches!(
            check_relations(&me, MimeType::Enrichment, &beside),
            Err(ValidationViolation::ParentBesideSibling { .. })
        ));

        let local_hierarchy = [(id("h", 191919), MimeType::MarcXchange)];
        assert!(check_relations(&me, MimeType::Enrichment, &local_hierarchy).is_ok());

        let unknown = [(id("b", 870970), MimeType::Unknown)];
        assert!(matches!(
            check_relations(&me, MimeType::Enrichment, &unknown),
            Err(ValidationViolation::InvalidSiblingMimetype { .. })
        ));
    }

    #[test]
    fn test_matvurd_parents_must_be_marcxchange() {
        let me = id("m", 870976);
        let ok = [
            (id("x", 870970), MimeType::MarcXchange),
            (id("y", 870970), MimeType::MarcXchange),
        ];
        assert!(check_relations(&me, MimeType::MatVurd, &ok).is_ok());

        let bad = [(id("x", 870971), MimeType::Article)];
        assert!(matches!(
            check_relations(&me, MimeType::MatVurd, &bad),
            Err(ValidationViolation::InvalidParentMimetype { mimetype: MimeType::Article, .. })
        ));
    }

    #[test]
    fn test_marcxchange_hierarchy() {
        let me = id("v", 870970);
        let ok = [
            (id("h", 870970), MimeType::MarcXchange),
            (id("a1", 870979), MimeType::Authority),
            (id("a2", 870979), MimeType::Authority),
        ];
        assert!(check_relations(&me, MimeType::MarcXchange, &ok).is_ok());

        let two_heads = [
            (id("h1", 870970), MimeType::MarcXchange),
            (id("h2", 870970), MimeType::MarcXchange),
        ];
        assert_eq!(
            check_relations(&me, MimeType::Article, &two_heads),
            Err(ValidationViolation::TooManyParents { found: 2 })
        );

        let sibling = [(id("v", 191919), MimeType::Enrichment)];
        assert!(check_relations(&me, MimeType::MarcXchange, &sibling).is_err());
    }
}
