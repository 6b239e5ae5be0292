//! # Montagem do bundle JSON
//!
//! Consolida o resultado do pipeline num único objeto serializável com
//! offsets absolutos: as fatias do corpo (relativas ao corte) são
//! projetadas para o buffer canónico somando `cut_index`, e cada relação
//! derivada do corpo leva o texto das extremidades já resolvido.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::pipeline::ExtractResult;
use crate::relations::{Offsets, RelationEnd, RelationKind};
use crate::segmenter::{Roster, Sumario};
use crate::span::EntityLabel;

/// O que conduziu uma fatia do corpo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceDriver {
    #[serde(rename = "DOC")]
    Doc,
    #[serde(rename = "SUBORG")]
    Suborg,
    #[serde(rename = "UNANCHORED")]
    Unanchored,
}

/// Fatia do corpo com offsets relativos ao corpo e absolutos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceOut {
    pub driver: SliceDriver,
    pub title: String,
    pub start_body: usize,
    pub end_body: usize,
    pub start_abs: usize,
    pub end_abs: usize,
    pub text: String,
    pub order_index: usize,
}

/// Cabeçalho do organismo de uma secção do corpo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionOrg {
    pub text: String,
    pub start_body: usize,
    pub end_body: usize,
    pub start_abs: usize,
    pub end_abs: usize,
}

/// Secção do corpo: organismo e as suas fatias pela ordem de leitura.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub org: SectionOrg,
    pub slices: Vec<SliceOut>,
}

/// Relação do sumário com o texto das extremidades resolvido a partir do
/// próprio texto do sumário.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationText {
    pub relation: RelationKind,
    pub head_offsets: Offsets,
    pub tail_offsets: Offsets,
    pub head_text: String,
    pub tail_text: String,
}

/// Relação derivada das fatias do corpo, com offsets absolutos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyRelation {
    pub relation: RelationKind,
    pub head: RelationEnd,
    pub tail: RelationEnd,
    pub head_offsets: Offsets,
    pub tail_offsets: Offsets,
    /// Offset absoluto do cabeçalho ORG da secção.
    pub section_id: usize,
    pub source: String,
    pub head_text: String,
    pub tail_text: String,
}

/// Sumário enriquecido com o texto de cada relação.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SumarioOut {
    #[serde(flatten)]
    pub sumario: Sumario,
    pub relations_text: Vec<RelationText>,
}

/// Bundle final: tudo o que um consumidor precisa para reconstruir a
/// estrutura do documento, incluindo os blocos de texto em bruto.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    pub cut_index: usize,
    pub sumario: SumarioOut,
    pub roster: Roster,
    pub sections: Vec<Section>,
    pub body_relations: Vec<BodyRelation>,
    pub full_raw: String,
    pub sumario_raw: String,
    pub body_raw: String,
}

fn slice_or_empty(text: &str, start: usize, end: usize) -> String {
    text.get(start..end).unwrap_or_default().to_string()
}

/// Monta o bundle a partir do resultado do pipeline.
pub fn assemble(result: &ExtractResult) -> Bundle {
    let cut = result.roster.cut_index;
    let s_text = &result.sumario.text;

    let relations_text: Vec<RelationText> = result
        .sumario
        .relations
        .iter()
        .map(|r| RelationText {
            relation: r.relation,
            head_offsets: r.head_offsets,
            tail_offsets: r.tail_offsets,
            head_text: slice_or_empty(s_text, r.head_offsets.start, r.head_offsets.end),
            tail_text: slice_or_empty(s_text, r.tail_offsets.start, r.tail_offsets.end),
        })
        .collect();

    // agrupa as fatias por secção (offset do cabeçalho ORG no corpo)
    let mut by_section: BTreeMap<usize, Vec<&crate::reanchor::BodyItem>> = BTreeMap::new();
    for it in &result.body_items {
        by_section.entry(it.section_id).or_default().push(it);
    }

    let mut sections: Vec<Section> = Vec::new();
    let mut body_relations: Vec<BodyRelation> = Vec::new();

    for items in by_section.values() {
        let mut items: Vec<&crate::reanchor::BodyItem> = items.clone();
        items.sort_by_key(|it| it.order_index);

        let org_text = items[0].org_text.clone();
        let org_start = items.iter().map(|it| it.org_start).min().unwrap_or(0);
        let org_end = items.iter().map(|it| it.org_end).max().unwrap_or(0);

        let mut slices: Vec<SliceOut> = Vec::new();
        for it in &items {
            let driver = match it.relation {
                RelationKind::SectionItem => SliceDriver::Doc,
                RelationKind::Contains => SliceDriver::Suborg,
                _ => SliceDriver::Unanchored,
            };
            slices.push(SliceOut {
                driver,
                title: it.doc_title.clone(),
                start_body: it.slice_start,
                end_body: it.slice_end,
                start_abs: cut + it.slice_start,
                end_abs: cut + it.slice_end,
                text: it.slice_text.clone(),
                order_index: it.order_index,
            });

            if matches!(it.relation, RelationKind::SectionItem | RelationKind::Contains) {
                let head_offsets = Offsets {
                    start: cut + it.org_start,
                    end: cut + it.org_end,
                };
                let tail_offsets = Offsets {
                    start: cut + it.doc_start,
                    end: cut + it.doc_end,
                };
                body_relations.push(BodyRelation {
                    relation: it.relation,
                    head: RelationEnd {
                        text: org_text.clone(),
                        label: EntityLabel::Org,
                    },
                    tail: RelationEnd {
                        text: it.doc_title.clone(),
                        label: if it.relation == RelationKind::SectionItem {
                            EntityLabel::Doc
                        } else {
                            EntityLabel::OrgSecundaria
                        },
                    },
                    head_offsets,
                    tail_offsets,
                    section_id: cut + it.section_id,
                    source: "body_slices".to_string(),
                    head_text: slice_or_empty(
                        &result.full_text,
                        head_offsets.start,
                        head_offsets.end,
                    ),
                    tail_text: slice_or_empty(
                        &result.full_text,
                        tail_offsets.start,
                        tail_offsets.end,
                    ),
                });
            }
        }

        sections.push(Section {
            org: SectionOrg {
                text: org_text,
                start_body: org_start,
                end_body: org_end,
                start_abs: cut + org_start,
                end_abs: cut + org_end,
            },
            slices,
        });
    }

    Bundle {
        cut_index: cut,
        sumario: SumarioOut {
            sumario: result.sumario.clone(),
            relations_text,
        },
        roster: result.roster.clone(),
        sections,
        body_relations,
        full_raw: result.full_text.clone(),
        sumario_raw: result.sumario.text.clone(),
        body_raw: result.body_text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::GazetaPipeline;
    use crate::samples::demo_texts;

    fn bundle_for(text: &str) -> Bundle {
        let result = GazetaPipeline::new().extract(text);
        assemble(&result)
    }

    #[test]
    fn test_bundle_sections_grouped_by_org() {
        let bundle = bundle_for(demo_texts()[0].1);
        assert_eq!(bundle.sections.len(), 2);
        for section in &bundle.sections {
            assert!(!section.slices.is_empty());
            assert_eq!(section.org.start_abs, bundle.cut_index + section.org.start_body);
        }
    }

    #[test]
    fn test_bundle_absolute_offsets_resolve_in_full_text() {
        let bundle = bundle_for(demo_texts()[0].1);
        for section in &bundle.sections {
            let org = &section.org;
            assert_eq!(
                &bundle.full_raw[org.start_abs..org.end_abs],
                &bundle.body_raw[org.start_body..org.end_body]
            );
        }
        for rel in &bundle.body_relations {
            assert_eq!(
                rel.head_text,
                &bundle.full_raw[rel.head_offsets.start..rel.head_offsets.end]
            );
        }
    }

    #[test]
    fn test_bundle_slice_drivers() {
        let despachos = bundle_for(demo_texts()[0].1);
        for section in &despachos.sections {
            for sl in &section.slices {
                assert_eq!(sl.driver, SliceDriver::Doc);
            }
        }
        let registo = bundle_for(demo_texts()[1].1);
        let drivers: Vec<SliceDriver> = registo
            .sections
            .iter()
            .flat_map(|s| s.slices.iter().map(|sl| sl.driver))
            .collect();
        assert!(!drivers.is_empty());
    }

    #[test]
    fn test_bundle_relations_text_matches_offsets() {
        let bundle = bundle_for(demo_texts()[1].1);
        for rt in &bundle.sumario.relations_text {
            let head = &bundle.sumario_raw[rt.head_offsets.start..rt.head_offsets.end];
            assert_eq!(rt.head_text, head);
        }
    }

    #[test]
    fn test_bundle_serializes_to_json() {
        let bundle = bundle_for(demo_texts()[0].1);
        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json.get("cut_index").is_some());
        assert!(json.get("sections").is_some());
        assert!(json["sumario"].get("relations_text").is_some());
        assert!(json.get("full_raw").is_some());
    }
}
