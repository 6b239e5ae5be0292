//! # Spans tipados e resolução de sobreposições
//!
//! Um [`EntitySpan`] é um intervalo de bytes `[start, end)` sobre um buffer
//! de texto fixo, com um rótulo estrutural. Os spans são produzidos numa
//! única passada pelo detetor e tornam-se imutáveis; depois da resolução de
//! sobreposições nenhum par de spans retidos se intersecta.

use serde::{Deserialize, Serialize};

/// Rótulo estrutural de um span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityLabel {
    /// Cabeçalho de organismo (todo em maiúsculas, possivelmente multilinha).
    #[serde(rename = "ORG")]
    Org,
    /// Organismo secundário listado dentro de uma secção.
    #[serde(rename = "ORG_SECUNDARIA")]
    OrgSecundaria,
    /// Linha-rótulo de documento (ex.: "Despacho n.º 59/2012").
    #[serde(rename = "DOC")]
    Doc,
}

impl EntityLabel {
    /// Nome do rótulo como aparece na saída JSON.
    pub fn name(&self) -> &'static str {
        match self {
            EntityLabel::Org => "ORG",
            EntityLabel::OrgSecundaria => "ORG_SECUNDARIA",
            EntityLabel::Doc => "DOC",
        }
    }
}

/// Intervalo de bytes rotulado sobre um buffer de texto específico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntitySpan {
    /// Offset inicial em bytes (inclusivo).
    pub start: usize,
    /// Offset final em bytes (exclusivo).
    pub end: usize,
    /// Rótulo estrutural.
    pub label: EntityLabel,
}

impl EntitySpan {
    pub fn new(start: usize, end: usize, label: EntityLabel) -> Self {
        Self { start, end, label }
    }

    /// Fatia do buffer coberta por este span.
    pub fn text<'a>(&self, buffer: &'a str) -> &'a str {
        &buffer[self.start..self.end]
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Remove duplicados exatos `(start, end, label)`, preservando a ordem.
pub fn dedupe_spans(spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    let mut seen = std::collections::HashSet::new();
    spans
        .into_iter()
        .filter(|sp| seen.insert((sp.start, sp.end, sp.label)))
        .collect()
}

/// Resolve sobreposições mantendo o span mais longo de cada aglomerado.
///
/// Passada de interval scheduling: ordena por `(start, -comprimento)` e
/// retém um span apenas se não intersectar nenhum já retido. O resultado
/// fica ordenado por `start`.
pub fn filter_longest(mut spans: Vec<EntitySpan>) -> Vec<EntitySpan> {
    spans.sort_by_key(|sp| (sp.start, std::cmp::Reverse(sp.len())));
    let mut kept: Vec<EntitySpan> = Vec::with_capacity(spans.len());
    let mut max_end = 0usize;
    for sp in spans {
        if sp.is_empty() {
            continue;
        }
        if kept.is_empty() || sp.start >= max_end {
            max_end = max_end.max(sp.end);
            kept.push(sp);
        }
    }
    kept
}
