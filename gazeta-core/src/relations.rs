//! # Construtor de relações
//!
//! Passagem única sobre os spans ordenados que materializa as arestas do
//! grafo da secção:
//!
//! - `SAME_AS` — a **primeira** ocorrência de um ORG liga-se a cada
//!   repetição (chave: texto normalizado em maiúsculas);
//! - `CONTAINS` — ORG corrente → ORG_SECUNDARIA;
//! - `SECTION_ITEM` — ORG corrente → DOC, incondicional: todo o DOC de uma
//!   secção pertence ao organismo que a governa;
//! - `HAS_DOCUMENT` — adicionalmente, último ORG_SECUNDARIA → DOC, se a
//!   distância entre o fim do suborganismo e o início do documento não
//!   exceder a janela. Um DOC perto de um suborganismo recebe as duas
//!   arestas.

use serde::{Deserialize, Serialize};

use crate::normalizer::{collapse_ws, norm_org_key};
use crate::span::{EntityLabel, EntitySpan};

/// Tipos de aresta emitidos pelo construtor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    #[serde(rename = "SAME_AS")]
    SameAs,
    #[serde(rename = "CONTAINS")]
    Contains,
    #[serde(rename = "SECTION_ITEM")]
    SectionItem,
    #[serde(rename = "HAS_DOCUMENT")]
    HasDocument,
}

impl RelationKind {
    pub fn name(&self) -> &'static str {
        match self {
            RelationKind::SameAs => "SAME_AS",
            RelationKind::Contains => "CONTAINS",
            RelationKind::SectionItem => "SECTION_ITEM",
            RelationKind::HasDocument => "HAS_DOCUMENT",
        }
    }
}

/// Par de offsets absolutos em bytes no buffer canónico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offsets {
    pub start: usize,
    pub end: usize,
}

impl From<EntitySpan> for Offsets {
    fn from(sp: EntitySpan) -> Self {
        Offsets {
            start: sp.start,
            end: sp.end,
        }
    }
}

/// Extremidade de uma aresta: texto da entidade (espaços colapsados) e rótulo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationEnd {
    pub text: String,
    pub label: EntityLabel,
}

/// Aresta do grafo de relações com proveniência da regra que a criou.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationEdge {
    pub id: usize,
    pub relation: RelationKind,
    pub head: RelationEnd,
    pub tail: RelationEnd,
    pub head_offsets: Offsets,
    pub tail_offsets: Offsets,
    /// Offset de início do ORG que governa a secção, quando aplicável.
    pub section_id: Option<usize>,
    /// Regra que produziu a aresta, para diagnóstico.
    pub source_rule: String,
}

fn end_of(text: &str, sp: EntitySpan) -> RelationEnd {
    RelationEnd {
        text: collapse_ws(sp.text(text)),
        label: sp.label,
    }
}

/// Constrói as arestas a partir dos spans detetados. `window` é a distância
/// máxima, em bytes, entre o fim de um ORG_SECUNDARIA e o início de um DOC
/// para que `HAS_DOCUMENT` seja emitida.
pub fn build_relations(text: &str, entities: &[EntitySpan], window: usize) -> Vec<RelationEdge> {
    let mut ents: Vec<EntitySpan> = entities.to_vec();
    ents.sort_by_key(|sp| (sp.start, std::cmp::Reverse(sp.end)));

    let mut edges: Vec<RelationEdge> = Vec::new();
    let mut current_org: Option<EntitySpan> = None;
    let mut last_suborg: Option<EntitySpan> = None;
    // chave normalizada → primeira ocorrência; nunca atualizado em repetições
    let mut first_org_by_norm: std::collections::HashMap<String, EntitySpan> =
        std::collections::HashMap::new();
    let mut next_id = 0usize;

    let mut push = |edges: &mut Vec<RelationEdge>,
                    relation: RelationKind,
                    head: EntitySpan,
                    tail: EntitySpan,
                    section_id: Option<usize>,
                    rule: &str| {
        edges.push(RelationEdge {
            id: next_id,
            relation,
            head: end_of(text, head),
            tail: end_of(text, tail),
            head_offsets: head.into(),
            tail_offsets: tail.into(),
            section_id,
            source_rule: rule.to_string(),
        });
        next_id += 1;
    };

    for sp in ents {
        match sp.label {
            EntityLabel::Org => {
                let key = norm_org_key(sp.text(text));
                if let Some(first) = first_org_by_norm.get(&key).copied() {
                    if first.start != sp.start {
                        push(
                            &mut edges,
                            RelationKind::SameAs,
                            first,
                            sp,
                            Some(first.start),
                            "org_same_norm",
                        );
                    }
                } else {
                    first_org_by_norm.insert(key, sp);
                }
                current_org = Some(sp);
                last_suborg = None;
            }
            EntityLabel::OrgSecundaria => {
                if let Some(org) = current_org {
                    push(
                        &mut edges,
                        RelationKind::Contains,
                        org,
                        sp,
                        Some(org.start),
                        "section_contains_suborg",
                    );
                }
                last_suborg = Some(sp);
            }
            EntityLabel::Doc => {
                if let Some(org) = current_org {
                    push(
                        &mut edges,
                        RelationKind::SectionItem,
                        org,
                        sp,
                        Some(org.start),
                        "section_item",
                    );
                }
                let near_suborg = last_suborg
                    .filter(|sub| sp.start >= sub.end && sp.start - sub.end <= window);
                if let Some(sub) = near_suborg {
                    push(
                        &mut edges,
                        RelationKind::HasDocument,
                        sub,
                        sp,
                        current_org.map(|o| o.start),
                        "nearest_suborg_window",
                    );
                }
            }
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractConfig;
    use crate::detector::detect_entities;

    fn relate(text: &str) -> Vec<RelationEdge> {
        let cfg = ExtractConfig::default();
        let ents = detect_entities(text, &cfg);
        build_relations(text, &ents, cfg.has_document_window)
    }

    #[test]
    fn test_section_item_links_doc_to_org() {
        let text = "SECRETARIA REGIONAL\nDespacho n.º 12/2020\n";
        let edges = relate(text);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].relation, RelationKind::SectionItem);
        assert_eq!(edges[0].head.text, "SECRETARIA REGIONAL");
        assert_eq!(edges[0].tail.text, "Despacho n.º 12/2020");
        assert_eq!(edges[0].section_id, Some(0));
    }

    #[test]
    fn test_doc_near_suborg_gets_both_edges() {
        // SECTION_ITEM é incondicional; HAS_DOCUMENT acresce quando o DOC
        // está dentro da janela do suborganismo
        let text = "CONSERVATÓRIA DO REGISTO\nEMPRESA AZUL TURISMO E VIAGENS LDA\nContrato de sociedade\n";
        let edges = relate(text);
        let kinds: Vec<RelationKind> = edges.iter().map(|e| e.relation).collect();
        assert_eq!(
            kinds,
            vec![
                RelationKind::Contains,
                RelationKind::SectionItem,
                RelationKind::HasDocument,
            ]
        );
        assert_eq!(edges[1].head.text, "CONSERVATÓRIA DO REGISTO");
        assert_eq!(edges[1].tail.text, "Contrato de sociedade");
        assert_eq!(edges[2].head.text, "EMPRESA AZUL TURISMO E VIAGENS LDA");
    }

    #[test]
    fn test_same_as_heads_at_first_occurrence() {
        let text = "SECRETARIA REGIONAL\nAviso\nCÂMARA MUNICIPAL\nSECRETARIA  REGIONAL\nSECRETARIA REGIONAL\n";
        let edges = relate(text);
        let same: Vec<&RelationEdge> = edges
            .iter()
            .filter(|e| e.relation == RelationKind::SameAs)
            .collect();
        assert_eq!(same.len(), 2);
        // a cabeça é sempre a primeira ocorrência; a cauda, a repetição
        for e in same {
            assert_eq!(e.head_offsets.start, 0);
            assert!(e.tail_offsets.start > 0);
            assert_eq!(e.section_id, Some(0));
            assert_eq!(e.source_rule, "org_same_norm");
        }
    }

    #[test]
    fn test_doc_beyond_window_has_no_has_document() {
        let filler = "X".repeat(400);
        let text = format!(
            "SECRETARIA REGIONAL\nEMPRESA AZUL TURISMO E VIAGENS LDA\n{filler} prosa\nAviso n.º 1/2020\n"
        );
        let edges = relate(&text);
        assert!(edges.iter().all(|e| e.relation != RelationKind::HasDocument));
        let doc_edge = edges
            .iter()
            .find(|e| e.tail.label == EntityLabel::Doc)
            .unwrap();
        assert_eq!(doc_edge.relation, RelationKind::SectionItem);
        assert_eq!(doc_edge.head.text, "SECRETARIA REGIONAL");
    }

    #[test]
    fn test_new_org_resets_suborg() {
        let text = "SECRETARIA REGIONAL\nEMPRESA AZUL TURISMO E VIAGENS LDA\nCÂMARA MUNICIPAL\nAviso\n";
        let edges = relate(text);
        let doc_edge = edges
            .iter()
            .find(|e| e.tail.label == EntityLabel::Doc)
            .unwrap();
        assert_eq!(doc_edge.relation, RelationKind::SectionItem);
        assert_eq!(doc_edge.head.text, "CÂMARA MUNICIPAL");
        assert!(edges.iter().all(|e| e.relation != RelationKind::HasDocument));
    }

    #[test]
    fn test_section_id_is_governing_org_start() {
        let text = "SECRETARIA REGIONAL\nDespacho n.º 1/2020\nCÂMARA MUNICIPAL\nAviso n.º 2/2020\n";
        let edges = relate(text);
        let second_org = text.find("CÂMARA").unwrap();
        for e in &edges {
            let expected = if e.tail_offsets.start < second_org {
                0
            } else {
                second_org
            };
            assert_eq!(e.section_id, Some(expected), "aresta: {:?}", e.relation);
        }
    }
}
