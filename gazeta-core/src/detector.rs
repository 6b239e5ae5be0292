//! # Detetor de entidades estruturais
//!
//! Máquina de estados orientada a linhas físicas que percorre o texto
//! canónico uma única vez e emite spans tipados:
//!
//! - **ORG**: cabeçalho de organismo — linha toda em maiúsculas cujo primeiro
//!   token alfabético é um dos iniciadores institucionais conhecidos, com até
//!   três linhas de continuação absorvidas por heurística;
//! - **DOC**: linha-rótulo de documento ("Despacho n.º 59/2012", "Aviso",
//!   "Contrato de sociedade", ...);
//! - **ORG_SECUNDARIA**: linha em maiúsculas com tokens de conteúdo
//!   suficientes que não inicia cabeçalho, ou linha curta seguida de
//!   "Contrato de sociedade" nas duas linhas seguintes.
//!
//! A regra dura que sustenta tudo: uma linha com qualquer letra minúscula
//! nunca inicia nem continua um ORG/ORG_SECUNDARIA — a prosa do corpo é de
//! caixa mista, os cabeçalhos são fiavelmente em maiúsculas.

use std::sync::OnceLock;

use regex::Regex;

use crate::config::ExtractConfig;
use crate::normalizer::{collapse_ws, strip_diacritics};
use crate::span::{dedupe_spans, filter_longest, EntityLabel, EntitySpan};

/// Primeiros tokens que iniciam um cabeçalho de organismo. As formas com e
/// sem diacríticos coexistem porque o OCR oscila entre elas.
const HEADER_STARTERS: &[&str] = &[
    "SECRETARIA",
    "SECRETARIAS",
    "VICE-PRESIDÊNCIA",
    "VICE-PRESIDENCIA",
    "PRESIDÊNCIA",
    "PRESIDENCIA",
    "DIREÇÃO",
    "DIRECÇÃO",
    "DIRECAO",
    "ASSEMBLEIA",
    "CÂMARA",
    "CAMARA",
    "MUNICIPIO",
    "MUNICÍPIO",
    "TRIBUNAL",
    "CONSERVATÓRIA",
    "CONSERVATORIA",
    "PRESIDÊNCIA DO GOVERNO",
    "PRESIDENCIA DO GOVERNO",
    "APRAM",
];

/// Palavras funcionais ignoradas na contagem de tokens de conteúdo.
const STOPWORDS_UP: &[&str] = &[
    "DO", "DA", "DE", "DOS", "DAS", "E", "A", "O", "EM", "PARA", "COM", "NO", "NA", "NOS", "NAS",
];

/// Rótulos de documento aceites por correspondência exata da linha.
const DOC_LABELS_SECTION: &[&str] = &[
    "RETIFICAÇÃO",
    "RECTIFICAÇÃO",
    "RETIFICACAO",
    "RECTIFICACAO",
    "AVISO",
    "AVISOS",
    "DESPACHO",
    "DESPACHO CONJUNTO",
    "EDITAL",
    "DELIBERAÇÃO",
    "DELIBERACAO",
    "DECLARAÇÃO",
    "DECLARACAO",
    "LISTA",
    "LISTAS",
    "ANÚNCIO",
    "ANUNCIO",
    "ANÚNCIO (RESUMO)",
    "ANUNCIO (RESUMO)",
    "CONVOCATÓRIA",
    "CONVOCATORIA",
    "REVOGAÇÃO",
    "REVOGACAO",
    "CONTRATO",
    "DECRETO",
    "RESOLUÇÃO",
    "RESOLUCAO",
    "DECRETO REGULAMENTAR REGIONAL",
    "PORTARIA",
    "MUDANÇA",
    "MUDANCA",
    "CONVERTIDO",
    "CESSAÇÃO",
    "CESSACAO",
];

/// Rótulos que aceitam a forma numerada ("DESPACHO n.º 59/2012").
const DOC_NUMBERED_PREFIXES: &[&str] = &[
    "DESPACHO",
    "DECLARAÇÃO",
    "DECLARACAO",
    "RETIFICAÇÃO",
    "RECTIFICAÇÃO",
    "AVISO",
    "AVISOS",
    "EDITAL",
    "ANÚNCIO",
    "ANUNCIO",
    "REVOGAÇÃO",
    "REVOGACAO",
    "CONTRATO",
    "DECRETO",
    "RESOLUÇÃO",
    "RESOLUCAO",
    "PORTARIA",
];

/// Marcadores de numeração reconhecidos após um prefixo de rótulo.
const NUMBER_MARKERS: &[&str] = &["N.º", "Nº", "N°", "N.O"];

/// Substantivos de domínio frequentes em linhas de continuação de cabeçalho.
const CONTINUATION_CONTENT_NOUNS: &[&str] = &[
    "PLANO",
    "FINANÇAS",
    "FINANCAS",
    "EDUCAÇÃO",
    "EDUCACAO",
    "RECURSOS",
    "HUMANOS",
    "CULTURA",
    "TURISMO",
    "TRANSPORTES",
    "AMBIENTE",
    "ASSUNTOS",
    "SOCIAIS",
    "TRIBUNAL",
];

fn contrato_soc_rx() -> &'static Regex {
    static RX: OnceLock<Regex> = OnceLock::new();
    RX.get_or_init(|| {
        Regex::new(r"(?i)\bcontrato\s*de\s*sociedade\b").expect("padrão fixo válido")
    })
}

/// Uma linha física com os seus offsets no buffer (fim inclui a quebra).
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    start: usize,
    end: usize,
    raw: &'a str,
}

fn line_offsets(text: &str) -> Vec<Line<'_>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    for part in text.split_inclusive('\n') {
        out.push(Line {
            start: pos,
            end: pos + part.len(),
            raw: part,
        });
        pos += part.len();
    }
    out
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn has_lowercase_letter(line: &str) -> bool {
    line.trim()
        .chars()
        .any(|c| c.is_alphabetic() && c.is_lowercase())
}

/// Primeiro token alfabético da linha, sem diacríticos, em maiúsculas e sem
/// pontuação nas pontas.
fn first_alpha_word_upper(line: &str) -> String {
    for w in line.trim().split_whitespace() {
        if w.chars().any(|c| c.is_alphabetic()) {
            return strip_diacritics(w)
                .to_uppercase()
                .trim_matches(|c| matches!(c, ',' | '.' | ';' | ':' | '-'))
                .to_string();
        }
    }
    String::new()
}

fn starts_with_header_starter(line: &str) -> bool {
    let up = line.trim().to_uppercase();
    if up.is_empty() {
        return false;
    }
    let first = first_alpha_word_upper(&up);
    if HEADER_STARTERS.contains(&first.as_str()) {
        return true;
    }
    // iniciadores multi-palavra no início da linha ("PRESIDÊNCIA DO GOVERNO")
    HEADER_STARTERS.iter().any(|s| up.starts_with(s))
}

/// Linha-rótulo de documento: correspondência exata, forma numerada ou
/// "Contrato de sociedade". Um `:` final é tolerado (ruído de OCR frequente
/// em rótulos como "Despacho:").
fn is_doc_label_line(line: &str) -> bool {
    let up = line.trim().to_uppercase();
    if up.is_empty() {
        return false;
    }
    let head = collapse_ws(&up);
    let head = head.strip_suffix(':').unwrap_or(&head);
    if DOC_LABELS_SECTION.contains(&head) {
        return true;
    }
    if DOC_NUMBERED_PREFIXES.iter().any(|p| head.starts_with(p))
        && NUMBER_MARKERS.iter().any(|m| head.contains(m))
    {
        return true;
    }
    contrato_soc_rx().is_match(&up)
}

/// Conta tokens com letra que não são palavras funcionais.
fn content_token_count(line: &str) -> usize {
    line.trim()
        .split_whitespace()
        .filter(|t| t.chars().any(|c| c.is_alphabetic()))
        .map(|t| {
            strip_diacritics(t)
                .to_uppercase()
                .trim_matches(|c| matches!(c, ',' | '.' | ';' | ':'))
                .to_string()
        })
        .filter(|t| !STOPWORDS_UP.contains(&t.as_str()))
        .count()
}

/// Pistas de continuação de cabeçalho: a linha atual começa por palavra
/// funcional com conteúdo a seguir, ou a anterior termina em conector,
/// vírgula ou hífen, ou há um substantivo de domínio após a funcional.
fn is_header_continuation(prev_line: &str, curr_line: &str) -> bool {
    if is_blank(curr_line) {
        return false;
    }
    let curr_up = curr_line.trim().to_uppercase();
    let first = curr_up.split_whitespace().next().unwrap_or("");

    if STOPWORDS_UP.contains(&first) && content_token_count(&curr_up) >= 1 {
        return true;
    }

    let prev_up = prev_line.trim().to_uppercase();
    if [" E", " DO", " DA", " DE", " DOS", " DAS"]
        .iter()
        .any(|suf| prev_up.ends_with(suf))
    {
        return true;
    }
    if prev_up.ends_with(',') || prev_up.ends_with('-') || prev_up.ends_with('–') {
        return true;
    }

    if STOPWORDS_UP.contains(&first)
        && CONTINUATION_CONTENT_NOUNS.iter().any(|n| curr_up.contains(n))
    {
        return true;
    }

    false
}

/// Span aparado às pontas; devolve `None` se só restar espaço em branco.
fn trimmed_span(text: &str, start: usize, end: usize, label: EntityLabel) -> Option<EntitySpan> {
    let end = end.min(text.len()).max(start);
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    let s = start + lead;
    let e = end - trail;
    if e > s {
        Some(EntitySpan::new(s, e, label))
    } else {
        None
    }
}

/// Absorve linhas de continuação de um cabeçalho iniciado em `lines[i]`.
/// Devolve `(fim_do_cabeçalho, próxima_linha)`.
fn absorb_header(
    lines: &[Line<'_>],
    i: usize,
    cfg: &ExtractConfig,
    break_on_lowercase: bool,
) -> (usize, usize) {
    let mut header_end = lines[i].end;
    let mut header_lines = 1usize;
    let mut prev = lines[i].raw;
    let mut j = i + 1;
    while j < lines.len() && header_lines < cfg.max_header_lines {
        let lj = &lines[j];
        if is_blank(lj.raw)
            || is_doc_label_line(lj.raw)
            || starts_with_header_starter(lj.raw)
            || (break_on_lowercase && has_lowercase_letter(lj.raw))
        {
            break;
        }
        if is_header_continuation(prev, lj.raw) {
            header_end = lj.end;
            prev = lj.raw;
            header_lines += 1;
            j += 1;
        } else {
            break;
        }
    }
    (header_end, j)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InSection,
}

/// Varre o texto e emite os spans ORG / ORG_SECUNDARIA / DOC já
/// deduplicados e sem sobreposições (o mais longo de cada aglomerado vence).
pub fn detect_entities(text: &str, cfg: &ExtractConfig) -> Vec<EntitySpan> {
    let lines = line_offsets(text);
    let mut spans: Vec<EntitySpan> = Vec::new();
    let mut state = State::Outside;
    let mut i = 0usize;

    while i < lines.len() {
        let ln = lines[i];

        if state == State::Outside {
            if is_blank(ln.raw) {
                i += 1;
                continue;
            }
            if starts_with_header_starter(ln.raw) && !has_lowercase_letter(ln.raw) {
                let (header_end, j) = absorb_header(&lines, i, cfg, false);
                if let Some(sp) = trimmed_span(text, ln.start, header_end, EntityLabel::Org) {
                    spans.push(sp);
                }
                i = j;
                state = State::InSection;
                continue;
            }
            // rótulos DOC antes do primeiro cabeçalho são ignorados
            i += 1;
            continue;
        }

        // IN_SECTION
        if starts_with_header_starter(ln.raw)
            && !is_blank(ln.raw)
            && !has_lowercase_letter(ln.raw)
        {
            let (header_end, j) = absorb_header(&lines, i, cfg, true);
            if let Some(sp) = trimmed_span(text, ln.start, header_end, EntityLabel::Org) {
                spans.push(sp);
            }
            i = j;
            continue;
        }

        if is_doc_label_line(ln.raw) {
            if let Some(sp) = trimmed_span(text, ln.start, ln.end, EntityLabel::Doc) {
                spans.push(sp);
            }
            i += 1;
            continue;
        }

        // Promoção a ORG_SECUNDARIA
        let mut promote_secondary = false;
        if !is_blank(ln.raw) && !has_lowercase_letter(ln.raw) {
            if content_token_count(ln.raw) >= cfg.min_content_tokens
                && !starts_with_header_starter(ln.raw)
            {
                promote_secondary = true;
            } else {
                // look-ahead por "Contrato de sociedade"
                let mut steps = 0usize;
                let mut j = i + 1;
                while steps < cfg.lookahead_lines && j < lines.len() {
                    let la = lines[j].raw.trim().to_uppercase();
                    if contrato_soc_rx().is_match(&la) {
                        promote_secondary = true;
                        break;
                    }
                    if starts_with_header_starter(&la) || is_doc_label_line(&la) {
                        break;
                    }
                    steps += 1;
                    j += 1;
                }
            }
        }

        if promote_secondary {
            // absorve 0–2 continuações antes de criar UM único span
            let mut block_end = ln.end;
            let mut consumed = 0usize;
            let mut j = i + 1;
            while consumed < cfg.max_suborg_continuation_lines && j < lines.len() {
                let lj = &lines[j];
                if is_blank(lj.raw)
                    || starts_with_header_starter(lj.raw)
                    || is_doc_label_line(lj.raw)
                    || has_lowercase_letter(lj.raw)
                {
                    break;
                }
                block_end = lj.end;
                j += 1;
                consumed += 1;
            }
            if let Some(sp) = trimmed_span(text, ln.start, block_end, EntityLabel::OrgSecundaria) {
                spans.push(sp);
            }
            i = j;
            continue;
        }

        // texto corrido
        i += 1;
    }

    filter_longest(dedupe_spans(spans))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(text: &str) -> Vec<EntitySpan> {
        detect_entities(text, &ExtractConfig::default())
    }

    #[test]
    fn test_org_and_doc_single_lines() {
        let text = "SECRETARIA REGIONAL\nDespacho:\nFoo Bar Ltd - Autorização...........\n";
        let spans = detect(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].label, EntityLabel::Org);
        assert_eq!(spans[0].text(text), "SECRETARIA REGIONAL");
        assert_eq!(spans[1].label, EntityLabel::Doc);
        assert_eq!(spans[1].text(text), "Despacho:");
    }

    #[test]
    fn test_multiline_header_absorption() {
        let text = "SECRETARIA REGIONAL\nDO PLANO E FINANÇAS\nAviso n.º 3/2020\n";
        let spans = detect(text);
        assert_eq!(spans[0].label, EntityLabel::Org);
        assert_eq!(
            spans[0].text(text),
            "SECRETARIA REGIONAL\nDO PLANO E FINANÇAS"
        );
        assert_eq!(spans[1].label, EntityLabel::Doc);
    }

    #[test]
    fn test_header_absorption_stops_at_blank() {
        let text = "SECRETARIA REGIONAL\n\nDO PLANO E FINANÇAS\n";
        let spans = detect(text);
        assert_eq!(spans[0].text(text), "SECRETARIA REGIONAL");
    }

    #[test]
    fn test_lowercase_line_never_starts_header() {
        let text = "Secretaria Regional do Plano\nprosa corrida do corpo\n";
        assert!(detect(text).is_empty());
    }

    #[test]
    fn test_doc_numbered_forms() {
        assert!(is_doc_label_line("DESPACHO n.º 59/2012"));
        assert!(is_doc_label_line("Portaria nº 12/2021"));
        assert!(is_doc_label_line("Aviso"));
        assert!(is_doc_label_line("Despacho:"));
        assert!(!is_doc_label_line("DESPACHO sobre o assunto"));
    }

    #[test]
    fn test_contrato_de_sociedade_is_doc() {
        assert!(is_doc_label_line("Contrato de sociedade"));
        assert!(is_doc_label_line("CONTRATO  DE  SOCIEDADE"));
    }

    #[test]
    fn test_secondary_promotion_by_content_tokens() {
        let text = "SECRETARIA REGIONAL\nEMPRESA AZUL TURISMO E VIAGENS LDA\n";
        let spans = detect(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].label, EntityLabel::OrgSecundaria);
        assert_eq!(spans[1].text(text), "EMPRESA AZUL TURISMO E VIAGENS LDA");
    }

    #[test]
    fn test_secondary_promotion_by_lookahead() {
        // linha curta (< 4 tokens de conteúdo) promovida pelo look-ahead
        let text = "SECRETARIA REGIONAL\nFOO BAR LDA\nContrato de sociedade\n";
        let spans = detect(text);
        let labels: Vec<EntityLabel> = spans.iter().map(|s| s.label).collect();
        assert!(labels.contains(&EntityLabel::OrgSecundaria));
        assert!(labels.contains(&EntityLabel::Doc));
    }

    #[test]
    fn test_content_token_count_ignores_stopwords() {
        assert_eq!(content_token_count("DO PLANO E DAS FINANÇAS"), 2);
        assert_eq!(content_token_count("EMPRESA AZUL TURISMO LDA"), 4);
    }

    #[test]
    fn test_no_overlapping_spans_after_resolution() {
        let text = "SECRETARIA REGIONAL\nDO PLANO E FINANÇAS\nEMPRESA AZUL TURISMO E VIAGENS LDA\nDespacho n.º 1/2020\n";
        let spans = detect(text);
        for pair in spans.windows(2) {
            assert!(pair[0].end <= pair[1].start, "spans sobrepostos: {:?}", pair);
        }
    }

    #[test]
    fn test_doc_before_first_header_ignored() {
        let text = "Aviso\nSECRETARIA REGIONAL\n";
        let spans = detect(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].label, EntityLabel::Org);
    }
}
