//! # Normalizador de texto OCR
//!
//! O texto extraído por OCR chega com ruído sistemático: NBSPs, hífens de
//! translineação, glifos ordinais (º, °, ª), diacríticos inconsistentes e
//! espaçamento irregular. Este módulo produz duas vistas do texto:
//!
//! 1. **Texto canónico** ([`normalize_visible`]): a forma NFKC estável que o
//!    resto do pipeline usa como buffer de referência — é sobre ela que todos
//!    os offsets do sistema são expressos.
//! 2. **Sombra normalizada** ([`normalize_with_map`]): uma versão minúscula,
//!    sem diacríticos e com espaços colapsados, usada apenas para casar
//!    frases, acompanhada de um mapa byte-a-byte de volta ao texto canónico.
//!
//! A construção do mapa é deliberadamente feita em duas passadas: o colapso
//! de espaços altera o número de caracteres de forma não trivial, e só uma
//! reconstrução final garante que cada byte retido aponta para um offset
//! válido do original.

use unicode_normalization::char::{decompose_compatible, is_combining_mark};
use unicode_normalization::UnicodeNormalization;

/// Sombra normalizada de um texto, com mapa de offsets de volta ao original.
///
/// `index_map[i]` é o offset (em bytes) no texto original do caractere que
/// deu origem ao byte `i` do texto normalizado. O mapa é monotonicamente
/// não-decrescente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Texto normalizado: minúsculas, sem diacríticos, espaços simples.
    pub text: String,
    /// Mapa byte normalizado → byte original (início do caractere de origem).
    pub index_map: Vec<usize>,
}

impl NormalizedText {
    /// Converte um intervalo `[nstart, nend)` de bytes do texto normalizado
    /// no intervalo correspondente (fim-exclusivo) do texto original.
    pub fn to_original_span(
        &self,
        nstart: usize,
        nend: usize,
        original: &str,
    ) -> Option<(usize, usize)> {
        if nstart >= nend || nend > self.index_map.len() {
            return None;
        }
        let orig_start = self.index_map[nstart];
        let last = self.index_map[nend - 1];
        let last_ch = original.get(last..)?.chars().next()?;
        Some((orig_start, last + last_ch.len_utf8()))
    }
}

/// Canonicaliza o texto bruto vindo do extrator OCR, preservando o conteúdo
/// visível: NFKC, remoção de BOM/hífen discricionário/largura-zero, NBSP
/// vira espaço, aspas tipográficas viram ASCII.
///
/// O resultado é o buffer de referência do documento; todos os offsets
/// produzidos pelo pipeline apontam para ele.
pub fn normalize_visible(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.nfkc() {
        match ch {
            '\u{feff}' | '\u{ad}' | '\u{200b}' => {}
            '\u{a0}' => out.push(' '),
            '\u{201c}' | '\u{201d}' | '\u{ab}' | '\u{bb}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{2026}' => out.push_str("..."),
            _ => out.push(ch),
        }
    }
    out
}

/// Constrói a sombra normalizada de `original` com mapa de offsets.
///
/// Passos, nesta ordem:
/// - cura hífen + quebra de linha (`CULTU-\nRA` → `cultura`), descartando os
///   dois caracteres sem abrir buraco no mapa;
/// - qualquer espaço em branco (incluindo NBSP e quebras) vira um espaço;
/// - glifos ordinais º/° → `o` e ª → `a`;
/// - decomposição de compatibilidade por caractere com descarte das marcas
///   combinantes (equivalente a NFKD sem a categoria `Mn`);
/// - minúsculas;
/// - passada final que colapsa sequências de espaços e apara as pontas,
///   reconstruindo o mapa em paralelo.
///
/// A operação é total: nunca falha, e texto vazio produz sombra vazia.
pub fn normalize_with_map(original: &str) -> NormalizedText {
    // Primeira passada: caractere a caractere, guardando o offset de origem.
    let mut staged: Vec<(char, usize)> = Vec::with_capacity(original.len());
    let mut iter = original.char_indices().peekable();
    while let Some((i, ch)) = iter.next() {
        if ch == '-' {
            let rest = &original[i + ch.len_utf8()..];
            if rest.starts_with('\n') {
                iter.next();
                continue;
            }
            if rest.starts_with("\r\n") {
                iter.next();
                iter.next();
                continue;
            }
        }
        if ch.is_whitespace() {
            staged.push((' ', i));
            continue;
        }
        let folded = fold_ordinal_glyph(ch);
        decompose_compatible(folded, |d| {
            if !is_combining_mark(d) {
                for lc in d.to_lowercase() {
                    staged.push((lc, i));
                }
            }
        });
    }

    // Segunda passada: colapso de espaços + aparo, reconstruindo o mapa.
    let mut text = String::with_capacity(staged.len());
    let mut index_map = Vec::with_capacity(staged.len());
    let mut prev_space = true; // descarta espaços iniciais
    for (ch, oi) in staged {
        if ch == ' ' {
            if prev_space {
                continue;
            }
            prev_space = true;
            text.push(' ');
            index_map.push(oi);
        } else {
            prev_space = false;
            let before = text.len();
            text.push(ch);
            for _ in before..text.len() {
                index_map.push(oi);
            }
        }
    }
    if text.ends_with(' ') {
        text.pop();
        index_map.pop();
    }

    NormalizedText { text, index_map }
}

/// Normaliza uma frase isolada com as mesmas regras da sombra, sem mapa.
/// Usada para os padrões do re-ancorador e para chaves de comparação.
pub fn normalize_phrase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = true;
    for ch in s.nfkc() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
            continue;
        }
        prev_space = false;
        let folded = fold_ordinal_glyph(ch);
        decompose_compatible(folded, |d| {
            if !is_combining_mark(d) {
                out.extend(d.to_lowercase());
            }
        });
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Remove marcas diacríticas preservando o resto do texto (NFKD sem `Mn`).
pub fn strip_diacritics(s: &str) -> String {
    s.nfkd().filter(|ch| !is_combining_mark(*ch)).collect()
}

/// Colapsa qualquer sequência de espaço em branco num único espaço e apara.
pub fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Chave de comparação entre cabeçalhos ORG: espaços colapsados, maiúsculas,
/// pontuação final removida. Dois cabeçalhos com a mesma chave são tratados
/// como o mesmo organismo.
pub fn norm_org_key(s: &str) -> String {
    collapse_ws(s)
        .to_uppercase()
        .trim_matches(|c| matches!(c, ',' | '.' | ';' | ':'))
        .to_string()
}

fn fold_ordinal_glyph(ch: char) -> char {
    match ch {
        'º' | '°' => 'o',
        'ª' => 'a',
        _ => ch,
    }
}
