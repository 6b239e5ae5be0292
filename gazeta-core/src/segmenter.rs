//! # Segmentador Sumário / Corpo
//!
//! Divide o documento em duas metades a partir da primeira repetição de um
//! cabeçalho ORG: os jornais oficiais abrem com um sumário que lista os
//! organismos e só depois repetem cada cabeçalho no corpo. A heurística de
//! corte compara listas de tokens (maiúsculas, sem diacríticos) e dispara
//! quando um ORG posterior partilha um prefixo suficientemente longo com um
//! ORG anterior.
//!
//! Do lado do sumário constrói-se o roster — a pauta de organismos com os
//! seus suborganismos e títulos de documento — já saneado por duas
//! passagens: fusão de ORGs órfãos com o vizinho seguinte e coalescência de
//! cabeçalhos partidos (ORG + suborganismo único cujo concatenado coincide
//! com um ORG posterior).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ExtractConfig;
use crate::normalizer::{collapse_ws, norm_org_key, strip_diacritics};
use crate::relations::{RelationEdge, RelationKind};
use crate::span::{EntityLabel, EntitySpan};

/// Registo serializável de uma entidade do sumário.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntRecord {
    pub start: usize,
    pub end: usize,
    pub label: EntityLabel,
    pub text: String,
}

/// Sumário: texto original da metade inicial, entidades agrupadas por rótulo
/// e relações integralmente contidas nela.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sumario {
    pub text: String,
    /// Chaves sempre presentes: "ORG", "ORG_SECUNDARIA", "DOC".
    pub ents: BTreeMap<String, Vec<EntRecord>>,
    pub relations: Vec<RelationEdge>,
}

/// Entrada do roster: um organismo com os suborganismos e títulos de
/// documento que o sumário lhe atribui.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterOrg {
    pub org_text: String,
    pub suborg_texts: Vec<String>,
    pub doc_texts: Vec<String>,
}

/// Pauta completa de organismos do sumário, com o offset do corte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    pub cut_index: usize,
    pub orgs: Vec<RosterOrg>,
}

/// Resultado da segmentação.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segmented {
    pub sumario: Sumario,
    pub roster: Roster,
    pub body_text: String,
    /// Relações com pelo menos uma extremidade fora do sumário.
    pub file_relations: Vec<RelationEdge>,
}

fn org_tokens(s: &str) -> Vec<String> {
    strip_diacritics(s)
        .to_uppercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Offset do corte: início do primeiro ORG cuja lista de tokens repete
/// exatamente a de um ORG anterior, ou partilha com ela um prefixo de pelo
/// menos `min_shared_prefix_tokens`. Sem repetição, o documento inteiro é
/// sumário.
pub fn find_cut_index(text: &str, entities: &[EntitySpan], cfg: &ExtractConfig) -> usize {
    let mut orgs: Vec<EntitySpan> = entities
        .iter()
        .copied()
        .filter(|sp| sp.label == EntityLabel::Org)
        .collect();
    orgs.sort_by_key(|sp| sp.start);

    let mut seen: Vec<Vec<String>> = Vec::new();
    for sp in orgs {
        let toks = org_tokens(sp.text(text));
        if toks.is_empty() {
            continue;
        }
        for prev in &seen {
            // repetição exata corta sempre, mesmo para cabeçalhos curtos
            if *prev == toks {
                return sp.start;
            }
            let shared = prev.len().min(toks.len());
            if shared >= cfg.min_shared_prefix_tokens && prev[..shared] == toks[..shared] {
                return sp.start;
            }
        }
        seen.push(toks);
    }
    text.len()
}

fn merge_orphan_orgs(orgs: Vec<RosterOrg>) -> Vec<RosterOrg> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i < orgs.len() {
        let o = &orgs[i];
        if o.suborg_texts.is_empty() && o.doc_texts.is_empty() && i + 1 < orgs.len() {
            let next = &orgs[i + 1];
            out.push(RosterOrg {
                org_text: collapse_ws(&format!("{} {}", o.org_text, next.org_text)),
                suborg_texts: next.suborg_texts.clone(),
                doc_texts: next.doc_texts.clone(),
            });
            i += 2;
        } else {
            out.push(o.clone());
            i += 1;
        }
    }
    out
}

/// Cabeçalho partido em dois: um ORG com exatamente um suborganismo cujo
/// concatenado coincide (chave normalizada) com um ORG posterior absorve os
/// documentos desse ORG e o duplicado desaparece.
fn coalesce_split_orgs(mut orgs: Vec<RosterOrg>) -> Vec<RosterOrg> {
    let mut i = 0usize;
    while i < orgs.len() {
        if orgs[i].suborg_texts.len() == 1 {
            let combined =
                collapse_ws(&format!("{} {}", orgs[i].org_text, orgs[i].suborg_texts[0]));
            let key = norm_org_key(&combined);
            let dup = orgs
                .iter()
                .enumerate()
                .skip(i + 1)
                .find(|(_, o)| norm_org_key(&o.org_text) == key)
                .map(|(j, _)| j);
            if let Some(j) = dup {
                let later = orgs.remove(j);
                orgs[i].org_text = combined;
                orgs[i].suborg_texts.clear();
                for d in later.doc_texts {
                    if !orgs[i].doc_texts.contains(&d) {
                        orgs[i].doc_texts.push(d);
                    }
                }
            }
        }
        i += 1;
    }
    orgs
}

/// Segmenta o documento: calcula o corte, constrói o sumário e o roster e
/// devolve o corpo por reancorar.
pub fn split(
    text: &str,
    entities: &[EntitySpan],
    relations: &[RelationEdge],
    cfg: &ExtractConfig,
) -> Segmented {
    let cut = find_cut_index(text, entities, cfg);

    let mut sum_ents: Vec<EntitySpan> = entities
        .iter()
        .copied()
        .filter(|sp| sp.end <= cut)
        .collect();
    sum_ents.sort_by_key(|sp| (sp.start, std::cmp::Reverse(sp.end)));

    let mut by_label: BTreeMap<String, Vec<EntRecord>> = BTreeMap::new();
    for label in ["ORG", "ORG_SECUNDARIA", "DOC"] {
        by_label.insert(label.to_string(), Vec::new());
    }
    for sp in &sum_ents {
        by_label
            .entry(sp.label.name().to_string())
            .or_default()
            .push(EntRecord {
                start: sp.start,
                end: sp.end,
                label: sp.label,
                text: collapse_ws(sp.text(text)),
            });
    }

    let inside = |e: &RelationEdge| {
        e.head_offsets.start < cut
            && e.head_offsets.end <= cut
            && e.tail_offsets.start < cut
            && e.tail_offsets.end <= cut
    };
    let sum_relations: Vec<RelationEdge> = relations.iter().filter(|e| inside(e)).cloned().collect();
    let file_relations: Vec<RelationEdge> =
        relations.iter().filter(|e| !inside(e)).cloned().collect();

    // ORGs do sumário pela ordem de ocorrência; as arestas são agrupadas
    // pelos offsets da cabeça, que identificam a ocorrência exata
    let org_spans: Vec<EntitySpan> = sum_ents
        .iter()
        .copied()
        .filter(|sp| sp.label == EntityLabel::Org)
        .collect();
    let mut orgs: Vec<RosterOrg> = org_spans
        .iter()
        .map(|sp| RosterOrg {
            org_text: collapse_ws(sp.text(text)),
            suborg_texts: Vec::new(),
            doc_texts: Vec::new(),
        })
        .collect();
    let idx_by_offsets: std::collections::HashMap<(usize, usize), usize> = org_spans
        .iter()
        .enumerate()
        .map(|(i, sp)| ((sp.start, sp.end), i))
        .collect();

    for e in &sum_relations {
        let Some(&idx) = idx_by_offsets.get(&(e.head_offsets.start, e.head_offsets.end)) else {
            continue;
        };
        match e.relation {
            RelationKind::Contains => {
                orgs[idx].suborg_texts.push(e.tail.text.clone());
            }
            RelationKind::SectionItem => {
                // títulos com vírgula são prosa colada pelo OCR, não rótulos
                if !e.tail.text.contains(',') {
                    orgs[idx].doc_texts.push(e.tail.text.clone());
                }
            }
            // HAS_DOCUMENT tem um suborganismo na cabeça; o DOC já chega ao
            // organismo pela aresta SECTION_ITEM incondicional
            RelationKind::HasDocument | RelationKind::SameAs => {}
        }
    }

    let orgs = coalesce_split_orgs(merge_orphan_orgs(orgs));

    Segmented {
        sumario: Sumario {
            text: text[..cut].to_string(),
            ents: by_label,
            relations: sum_relations,
        },
        roster: Roster {
            cut_index: cut,
            orgs,
        },
        body_text: text[cut..].to_string(),
        file_relations,
    }
}
