//! # Reancoragem do corpo
//!
//! Reencontra no corpo do documento as frases do roster (organismos,
//! suborganismos e títulos de documento) apesar do ruído de OCR: quebras de
//! linha a meio de nomes, hífens de translineação, NBSP, diacríticos
//! perdidos e variantes de glifos ordinais.
//!
//! A estratégia é uma sombra normalizada do corpo com mapa de índices byte a
//! byte: as frases são compiladas em regex tolerantes a espaço sobre a
//! sombra e cada acerto é projetado de volta para offsets do texto original.
//! Acertos de ORG/ORG_SECUNDARIA passam ainda pelo portão ALL-CAPS sobre o
//! texto **original** — a sombra é minúscula por construção e não serve para
//! validar caixa.
//!
//! A atribuição é feita pela ordem do roster com cursores monótonos, e as
//! secções são fatiadas pelas âncoras DOC (ou, na falta delas, pelos
//! suborganismos).

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ExtractConfig;
use crate::normalizer::{collapse_ws, normalize_phrase, normalize_with_map};
use crate::relations::RelationKind;
use crate::segmenter::Roster;

/// Fatia ordenada do corpo, ancorada a um organismo e conduzida por um
/// documento ou suborganismo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyItem {
    pub org_text: String,
    pub org_start: usize,
    pub org_end: usize,
    /// Identificador da secção: offset do cabeçalho ORG no corpo.
    pub section_id: usize,
    pub doc_title: String,
    pub doc_start: usize,
    pub doc_end: usize,
    /// `SECTION_ITEM` quando a fatia é conduzida por um DOC, `CONTAINS`
    /// quando o condutor é um suborganismo.
    pub relation: RelationKind,
    pub slice_text: String,
    pub slice_start: usize,
    pub slice_end: usize,
    /// Posição (base 1) na ordem de leitura do corpo.
    pub order_index: usize,
}

fn blank_line_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| Regex::new(r"\n\s*\n").expect("padrão fixo válido"))
}

fn is_all_caps_token(tok: &str) -> bool {
    let mut has_alpha = false;
    for ch in tok.chars() {
        if ch.is_alphabetic() {
            has_alpha = true;
            if ch.is_lowercase() {
                return false;
            }
        }
    }
    has_alpha
}

/// Portão ALL-CAPS: rejeita fatias com linha em branco no meio e fatias em
/// que algum token com letras não esteja inteiramente em maiúsculas.
fn passes_all_caps_gate(text: &str) -> bool {
    if blank_line_rx().is_match(text) {
        return false;
    }
    for tok in text.trim().split_whitespace() {
        if tok.chars().any(|c| c.is_alphabetic()) && !is_all_caps_token(tok) {
            return false;
        }
    }
    true
}

/// Compila uma frase do roster numa regex sobre a sombra normalizada:
/// tokens escapados unidos por `\s+`, com `\s*` opcional após cada `/` para
/// tolerar números de diploma partidos pela translineação ("5/\n2020").
fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let norm = normalize_phrase(phrase);
    let mut parts: Vec<String> = Vec::new();
    for tok in norm.split(' ').filter(|t| !t.is_empty()) {
        let mut p = String::new();
        for ch in tok.chars() {
            let mut buf = [0u8; 4];
            p.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
            if ch == '/' {
                p.push_str(r"\s*");
            }
        }
        parts.push(p);
    }
    if parts.is_empty() {
        return None;
    }
    Regex::new(&parts.join(r"\s+")).ok()
}

/// Acertos por frase, em offsets do texto original, ordenados por
/// `(início, fim decrescente)`.
fn gather_candidates(
    norm: &crate::normalizer::NormalizedText,
    original: &str,
    phrases: &[&str],
    enforce_caps: bool,
) -> HashMap<String, Vec<(usize, usize)>> {
    let mut out: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
    for &p in phrases {
        if out.contains_key(p) {
            continue;
        }
        let Some(rx) = phrase_pattern(p) else {
            continue;
        };
        let mut hits: Vec<(usize, usize)> = Vec::new();
        for m in rx.find_iter(&norm.text) {
            let Some((ost, oen)) = norm.to_original_span(m.start(), m.end(), original) else {
                continue;
            };
            if enforce_caps && !passes_all_caps_gate(&original[ost..oen]) {
                continue;
            }
            hits.push((ost, oen));
        }
        if !hits.is_empty() {
            hits.sort_by_key(|&(st, en)| (st, std::cmp::Reverse(en)));
            out.insert(p.to_string(), hits);
        }
    }
    out
}

/// Reancora o roster no corpo e devolve as fatias pela ordem de leitura.
pub fn reanchor(body_text: &str, roster: &Roster, cfg: &ExtractConfig) -> Vec<BodyItem> {
    let norm = normalize_with_map(body_text);

    let org_phrases: Vec<&str> = roster.orgs.iter().map(|o| o.org_text.as_str()).collect();
    let sub_phrases: Vec<&str> = roster
        .orgs
        .iter()
        .flat_map(|o| o.suborg_texts.iter().map(String::as_str))
        .collect();
    let doc_phrases: Vec<&str> = roster
        .orgs
        .iter()
        .flat_map(|o| o.doc_texts.iter().map(String::as_str))
        .collect();

    let org_cands = gather_candidates(&norm, body_text, &org_phrases, true);
    let sub_cands = gather_candidates(&norm, body_text, &sub_phrases, true);
    let doc_cands = gather_candidates(&norm, body_text, &doc_phrases, false);

    // atribuição dos ORGs pela ordem do roster, cursor único e monótono
    let mut assigned: Vec<Option<(usize, usize)>> = Vec::with_capacity(roster.orgs.len());
    let mut cursor = 0usize;
    for org in &roster.orgs {
        let mut chosen = None;
        if let Some(cands) = org_cands.get(&org.org_text) {
            for &(st, en) in cands {
                if st >= cursor {
                    chosen = Some((st, en));
                    cursor = en;
                    break;
                }
            }
        }
        assigned.push(chosen);
    }

    let next_org_start = |i: usize| -> usize {
        assigned[i + 1..]
            .iter()
            .flatten()
            .next()
            .map(|&(st, _)| st)
            .unwrap_or(body_text.len())
    };

    let mut items: Vec<BodyItem> = Vec::new();
    let mut order_idx = 1usize;

    for (i, org) in roster.orgs.iter().enumerate() {
        let Some((org_st, org_en)) = assigned[i] else {
            continue;
        };
        let section_end = next_org_start(i).max(org_en);

        // suborganismos: recolhidos para o fatiamento de recurso
        let mut sub_assignments: Vec<(usize, usize, &str)> = Vec::new();
        let mut sub_cursor = org_st;
        for phrase in &org.suborg_texts {
            let Some(hits) = sub_cands.get(phrase) else {
                continue;
            };
            for &(st, en) in hits.iter().filter(|h| org_st <= h.0 && h.0 < section_end) {
                if st >= sub_cursor {
                    sub_assignments.push((st, en, phrase.as_str()));
                    sub_cursor = en;
                    break;
                }
            }
        }

        // âncoras DOC: modo primário de fatiamento
        let mut doc_assignments: Vec<(usize, usize)> = Vec::new();
        let mut doc_cursor = org_en;
        for phrase in &org.doc_texts {
            let Some(hits) = doc_cands.get(phrase) else {
                continue;
            };
            for &(st, en) in hits.iter().filter(|h| org_en <= h.0 && h.0 < section_end) {
                if st >= doc_cursor {
                    doc_assignments.push((st, en));
                    doc_cursor = en;
                    break;
                }
            }
        }

        // rede de segurança: olhar um pouco para trás do fim do cabeçalho
        if doc_assignments.is_empty() {
            let lookback = org_en.saturating_sub(cfg.doc_lookback);
            'outer: for phrase in &org.doc_texts {
                if let Some(hits) = doc_cands.get(phrase) {
                    for &(st, en) in hits {
                        if lookback <= st && st < org_en {
                            doc_assignments.push((st, en));
                            break 'outer;
                        }
                    }
                }
            }
        }

        let org_text = collapse_ws(&org.org_text);

        // recurso: fatiar pelos suborganismos quando não há DOCs
        if doc_assignments.is_empty() {
            for (k, &(sub_st, sub_en, sub_phrase)) in sub_assignments.iter().enumerate() {
                let seg_end = sub_assignments
                    .get(k + 1)
                    .map(|&(st, _, _)| st)
                    .unwrap_or(section_end)
                    .max(sub_st);
                items.push(BodyItem {
                    org_text: org_text.clone(),
                    org_start: org_st,
                    org_end: org_en,
                    section_id: org_st,
                    doc_title: sub_phrase.to_string(),
                    doc_start: sub_st,
                    doc_end: sub_en,
                    relation: RelationKind::Contains,
                    slice_text: body_text[sub_st..seg_end].trim().to_string(),
                    slice_start: sub_st,
                    slice_end: seg_end,
                    order_index: order_idx,
                });
                order_idx += 1;
            }
            continue;
        }

        // primário: fatiar pelas âncoras DOC
        let (first_st, first_en) = doc_assignments[0];
        let first_end = if doc_assignments.len() >= 2 {
            doc_assignments[1].0
        } else {
            section_end
        }
        .max(org_st);
        items.push(BodyItem {
            org_text: org_text.clone(),
            org_start: org_st,
            org_end: org_en,
            section_id: org_st,
            doc_title: body_text[first_st..first_en].to_string(),
            doc_start: first_st,
            doc_end: first_en,
            relation: RelationKind::SectionItem,
            slice_text: body_text[org_st..first_end].trim().to_string(),
            slice_start: org_st,
            slice_end: first_end,
            order_index: order_idx,
        });
        order_idx += 1;

        for j in 1..doc_assignments.len().saturating_sub(1) {
            let (cur_st, cur_en) = doc_assignments[j];
            let nxt_st = doc_assignments[j + 1].0.max(cur_st);
            items.push(BodyItem {
                org_text: org_text.clone(),
                org_start: org_st,
                org_end: org_en,
                section_id: org_st,
                doc_title: body_text[cur_st..cur_en].to_string(),
                doc_start: cur_st,
                doc_end: cur_en,
                relation: RelationKind::SectionItem,
                slice_text: body_text[cur_st..nxt_st].trim().to_string(),
                slice_start: cur_st,
                slice_end: nxt_st,
                order_index: order_idx,
            });
            order_idx += 1;
        }

        if doc_assignments.len() >= 2 {
            let (last_st, last_en) = doc_assignments[doc_assignments.len() - 1];
            let seg_end = section_end.max(last_st);
            items.push(BodyItem {
                org_text: org_text.clone(),
                org_start: org_st,
                org_end: org_en,
                section_id: org_st,
                doc_title: body_text[last_st..last_en].to_string(),
                doc_start: last_st,
                doc_end: last_en,
                relation: RelationKind::SectionItem,
                slice_text: body_text[last_st..seg_end].trim().to_string(),
                slice_start: last_st,
                slice_end: seg_end,
                order_index: order_idx,
            });
            order_idx += 1;
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::RosterOrg;

    fn roster(orgs: Vec<RosterOrg>) -> Roster {
        Roster {
            cut_index: 0,
            orgs,
        }
    }

    fn org(text: &str, suborgs: &[&str], docs: &[&str]) -> RosterOrg {
        RosterOrg {
            org_text: text.into(),
            suborg_texts: suborgs.iter().map(|s| s.to_string()).collect(),
            doc_texts: docs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_all_caps_gate() {
        assert!(passes_all_caps_gate("SECRETARIA REGIONAL\nDO PLANO"));
        assert!(!passes_all_caps_gate("Secretaria Regional"));
        assert!(!passes_all_caps_gate("SECRETARIA\n\nREGIONAL"));
        assert!(passes_all_caps_gate("N.º 12/2020 APRAM"));
    }

    #[test]
    fn test_phrase_tolerates_linebreak_in_number() {
        let body = "Corpo do diploma.\nPortaria n.º 5/\n2020\nTexto.\n";
        let norm = normalize_with_map(body);
        let cands = gather_candidates(&norm, body, &["Portaria n.º 5/2020"], false);
        assert_eq!(cands.len(), 1);
        let hits = &cands["Portaria n.º 5/2020"];
        assert_eq!(&body[hits[0].0..hits[0].1], "Portaria n.º 5/\n2020");
    }

    #[test]
    fn test_org_without_anchor_yields_no_items() {
        let body = "prosa corrida sem cabeçalhos em maiúsculas\n";
        let r = roster(vec![org(
            "SECRETARIA REGIONAL DOS RECURSOS HUMANOS",
            &[],
            &["Despacho n.º 12/2020"],
        )]);
        assert!(reanchor(body, &r, &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn test_anchored_org_without_doc_or_suborg_hits_yields_no_items() {
        // o ORG ancora no corpo mas nenhum título nem suborganismo do roster
        // aparece na secção: nada de fatias, nem despejo da secção inteira
        let body = "SECRETARIA REGIONAL DOS RECURSOS HUMANOS\nProsa corrida sem qualquer rótulo reconhecível.\n";
        let r = roster(vec![org(
            "SECRETARIA REGIONAL DOS RECURSOS HUMANOS",
            &["EMPRESA VERDE NAVEGAÇÃO E TURISMO LDA"],
            &["Despacho n.º 99/2020"],
        )]);
        let norm = normalize_with_map(body);
        let org_hits = gather_candidates(
            &norm,
            body,
            &["SECRETARIA REGIONAL DOS RECURSOS HUMANOS"],
            true,
        );
        assert!(!org_hits.is_empty(), "o cabeçalho ancora no corpo");
        assert!(reanchor(body, &r, &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn test_gate_rejects_mixed_case_org_in_prose() {
        let body = "A Secretaria Regional dos Recursos Humanos informa.\n";
        let r = roster(vec![org(
            "SECRETARIA REGIONAL DOS RECURSOS HUMANOS",
            &[],
            &["Aviso"],
        )]);
        assert!(reanchor(body, &r, &ExtractConfig::default()).is_empty());
    }

    #[test]
    fn test_doc_driven_slicing_two_sections() {
        let body = "SECRETARIA REGIONAL DOS RECURSOS HUMANOS\nDespacho n.º 12/2020\nTexto integral do despacho.\nSECRETARIA REGIONAL DO PLANO E FINANÇAS\nAviso n.º 3/2020\nTexto integral do aviso.\n";
        let r = roster(vec![
            org(
                "SECRETARIA REGIONAL DOS RECURSOS HUMANOS",
                &[],
                &["Despacho n.º 12/2020"],
            ),
            org(
                "SECRETARIA REGIONAL DO PLANO E FINANÇAS",
                &[],
                &["Aviso n.º 3/2020"],
            ),
        ]);
        let items = reanchor(body, &r, &ExtractConfig::default());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].order_index, 1);
        assert_eq!(items[1].order_index, 2);
        assert_eq!(items[0].relation, RelationKind::SectionItem);
        assert_eq!(items[0].doc_title, "Despacho n.º 12/2020");
        assert!(items[0].slice_text.contains("Texto integral do despacho."));
        assert!(!items[0].slice_text.contains("aviso"));
        assert!(items[1].slice_text.contains("Texto integral do aviso."));
    }

    #[test]
    fn test_multiple_docs_slice_section() {
        let body = "SECRETARIA REGIONAL DOS RECURSOS HUMANOS\nDespacho n.º 1/2020\nPrimeiro texto.\nDespacho n.º 2/2020\nSegundo texto.\n";
        let r = roster(vec![org(
            "SECRETARIA REGIONAL DOS RECURSOS HUMANOS",
            &[],
            &["Despacho n.º 1/2020", "Despacho n.º 2/2020"],
        )]);
        let items = reanchor(body, &r, &ExtractConfig::default());
        assert_eq!(items.len(), 2);
        // a primeira fatia abre no cabeçalho e fecha na segunda âncora
        assert_eq!(items[0].slice_start, 0);
        assert_eq!(items[0].slice_end, items[1].doc_start);
        assert!(items[0].slice_text.contains("Primeiro texto."));
        assert!(items[1].slice_text.contains("Segundo texto."));
    }

    #[test]
    fn test_suborg_fallback_slicing() {
        let body = "CONSERVATÓRIA DO REGISTO COMERCIAL DO FUNCHAL\nEMPRESA AZUL TURISMO E VIAGENS LDA\nTexto do registo.\n";
        let r = roster(vec![org(
            "CONSERVATÓRIA DO REGISTO COMERCIAL DO FUNCHAL",
            &["EMPRESA AZUL TURISMO E VIAGENS LDA"],
            &[],
        )]);
        let items = reanchor(body, &r, &ExtractConfig::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].relation, RelationKind::Contains);
        assert_eq!(items[0].doc_title, "EMPRESA AZUL TURISMO E VIAGENS LDA");
        assert!(items[0].slice_text.contains("Texto do registo."));
    }

    #[test]
    fn test_lookback_recovers_doc_before_header_end() {
        let body = "Despacho n.º 9/2020\nSECRETARIA REGIONAL DOS RECURSOS HUMANOS\nTexto da secção.\n";
        let r = roster(vec![org(
            "SECRETARIA REGIONAL DOS RECURSOS HUMANOS",
            &[],
            &["Despacho n.º 9/2020"],
        )]);
        let items = reanchor(body, &r, &ExtractConfig::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].doc_start, 0);
        assert_eq!(items[0].relation, RelationKind::SectionItem);
    }

    #[test]
    fn test_repeated_doc_title_advances_cursor() {
        // duas âncoras com o mesmo título partilham a lista de acertos; o
        // cursor monótono garante que a segunda não reusa o primeiro acerto
        let body = "SECRETARIA REGIONAL DOS RECURSOS HUMANOS\nAviso\nPrimeiro.\nAviso\nSegundo.\n";
        let r = roster(vec![org(
            "SECRETARIA REGIONAL DOS RECURSOS HUMANOS",
            &[],
            &["Aviso", "Aviso"],
        )]);
        let items = reanchor(body, &r, &ExtractConfig::default());
        assert_eq!(items.len(), 2);
        assert!(items[0].doc_start < items[1].doc_start);
    }

    #[test]
    fn test_hyphen_linebreak_healed_match() {
        let body = "SECRETARIA REGIONAL DA CULTU-\nRA\nAviso n.º 7/2020\nTexto.\n";
        let r = roster(vec![org(
            "SECRETARIA REGIONAL DA CULTURA",
            &[],
            &["Aviso n.º 7/2020"],
        )]);
        let items = reanchor(body, &r, &ExtractConfig::default());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].org_start, 0);
    }
}
