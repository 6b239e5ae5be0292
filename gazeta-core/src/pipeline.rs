//! # Pipeline de Extração — Orquestrador com Eventos Observáveis
//!
//! O pipeline coordena todos os módulos (normalizador, detetor, relações,
//! segmentador, reancoragem) e emite eventos em cada passo via um canal Rust
//! (`mpsc`), permitindo que o servidor WebSocket transmita o progresso em
//! tempo real para o cliente.

use std::sync::mpsc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ExtractConfig;
use crate::detector::detect_entities;
use crate::normalizer::{collapse_ws, normalize_visible};
use crate::reanchor::{reanchor, BodyItem};
use crate::relations::{build_relations, RelationEdge};
use crate::segmenter::{split, EntRecord, Roster, Sumario};

/// Resultado consolidado de uma extração.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResult {
    /// Texto canónico completo; todos os offsets do resultado referem-se a ele.
    pub full_text: String,
    pub sumario: Sumario,
    pub roster: Roster,
    /// Texto do corpo (a partir do corte); offsets dos `body_items` são
    /// relativos a ele.
    pub body_text: String,
    pub body_items: Vec<BodyItem>,
    /// Relações com pelo menos uma extremidade fora do sumário (ex.:
    /// `SAME_AS` a atravessar o corte).
    pub file_relations: Vec<RelationEdge>,
    pub processing_ms: u64,
}

/// Eventos emitidos pelo pipeline durante o processamento.
///
/// Cada variante carrega os dados necessários para renderizar uma etapa da
/// extração na UI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: Texto canónico construído (NFKC + limpeza de glifos
    /// invisíveis).
    NormalizationDone {
        chars: usize,
        preview: String,
    },
    /// **Passo 2**: Entidades ORG / ORG_SECUNDARIA / DOC detetadas.
    EntitiesDetected {
        total: usize,
        spans: Vec<EntRecord>,
    },
    /// **Passo 3**: Grafo de relações construído.
    RelationsBuilt {
        total: usize,
    },
    /// **Passo 4**: Corte Sumário/Corpo encontrado e roster construído.
    SumarioSegmented {
        cut_index: usize,
        orgs: usize,
    },
    /// **Passo 5**: Fatias do corpo reancoradas.
    BodyAnchored {
        total_items: usize,
    },
    /// **Conclusão**: O processo terminou com sucesso.
    Done {
        result: ExtractResult,
    },
    /// **Falha**: Ocorreu um erro irrecuperável.
    Error {
        message: String,
    },
}

/// Prefixo de pré-visualização seguro para UTF-8 (graphemes, não bytes).
fn preview(text: &str, n: usize) -> String {
    text.graphemes(true)
        .take(n)
        .collect::<String>()
        .replace('\n', " ")
}

/// O pipeline de extração principal.
///
/// Atua como o **controlador** do sistema, orquestrando:
/// 1. Normalização do texto bruto de OCR para o buffer canónico.
/// 2. Deteção de entidades estruturais por máquina de estados de linhas.
/// 3. Construção do grafo de relações da secção.
/// 4. Segmentação Sumário/Corpo e construção do roster.
/// 5. Reancoragem das frases do roster no corpo.
///
/// # Modos de Uso
/// - **Sync**: Método `extract` para scripts e chamadas diretas.
/// - **Streaming**: Método `extract_streaming` para UIs reativas (via WebSocket).
/// - **Lote**: Método `extract_batch` para vários documentos em paralelo.
#[derive(Debug, Clone, Default)]
pub struct GazetaPipeline {
    pub config: ExtractConfig,
}

impl GazetaPipeline {
    /// Cria o pipeline com a configuração padrão.
    pub fn new() -> Self {
        Self {
            config: ExtractConfig::default(),
        }
    }

    /// Cria o pipeline com limiares personalizados.
    pub fn with_config(config: ExtractConfig) -> Self {
        Self { config }
    }

    /// Processa o texto de forma síncrona e retorna o resultado final.
    ///
    /// Ideal para processamento em lote ou quando não há necessidade de
    /// feedback visual.
    pub fn extract(&self, raw_text: &str) -> ExtractResult {
        let (tx, rx) = mpsc::channel();
        self.extract_streaming(raw_text, tx);
        let mut result = None;
        while let Ok(event) = rx.recv() {
            if let PipelineEvent::Done { result: r } = event {
                result = Some(r);
            }
        }
        // o canal só fecha depois do Done; o pipeline emite-o sempre
        result.unwrap_or_else(|| ExtractResult {
            full_text: String::new(),
            sumario: Sumario {
                text: String::new(),
                ents: Default::default(),
                relations: vec![],
            },
            roster: Roster {
                cut_index: 0,
                orgs: vec![],
            },
            body_text: String::new(),
            body_items: vec![],
            file_relations: vec![],
            processing_ms: 0,
        })
    }

    /// Processa vários documentos em paralelo.
    pub fn extract_batch(&self, raw_texts: &[String]) -> Vec<ExtractResult> {
        raw_texts.par_iter().map(|t| self.extract(t)).collect()
    }

    /// Executa o pipeline enviando eventos de progresso em tempo real.
    ///
    /// # Fluxo de Eventos
    /// 1. `NormalizationDone`: Buffer canónico pronto.
    /// 2. `EntitiesDetected`: Spans tipados com offsets absolutos.
    /// 3. `RelationsBuilt`: Arestas do grafo.
    /// 4. `SumarioSegmented`: Corte e roster.
    /// 5. `BodyAnchored`: Fatias do corpo.
    /// 6. `Done`: Resultado final consolidado.
    pub fn extract_streaming(&self, raw_text: &str, tx: mpsc::Sender<PipelineEvent>) {
        let start = std::time::Instant::now();

        // === Passo 1: Normalização ===
        let text = normalize_visible(raw_text);
        let _ = tx.send(PipelineEvent::NormalizationDone {
            chars: text.chars().count(),
            preview: preview(&text, 120),
        });

        // === Passo 2: Deteção de entidades ===
        let entities = detect_entities(&text, &self.config);
        let spans: Vec<EntRecord> = entities
            .iter()
            .map(|sp| EntRecord {
                start: sp.start,
                end: sp.end,
                label: sp.label,
                text: collapse_ws(sp.text(&text)),
            })
            .collect();
        let _ = tx.send(PipelineEvent::EntitiesDetected {
            total: spans.len(),
            spans,
        });

        // === Passo 3: Relações ===
        let relations = build_relations(&text, &entities, self.config.has_document_window);
        let _ = tx.send(PipelineEvent::RelationsBuilt {
            total: relations.len(),
        });

        // === Passo 4: Segmentação Sumário/Corpo ===
        let segmented = split(&text, &entities, &relations, &self.config);
        let _ = tx.send(PipelineEvent::SumarioSegmented {
            cut_index: segmented.roster.cut_index,
            orgs: segmented.roster.orgs.len(),
        });

        // === Passo 5: Reancoragem do corpo ===
        let body_items = reanchor(&segmented.body_text, &segmented.roster, &self.config);
        let _ = tx.send(PipelineEvent::BodyAnchored {
            total_items: body_items.len(),
        });

        let _ = tx.send(PipelineEvent::Done {
            result: ExtractResult {
                full_text: text,
                sumario: segmented.sumario,
                roster: segmented.roster,
                body_text: segmented.body_text,
                body_items,
                file_relations: segmented.file_relations,
                processing_ms: start.elapsed().as_millis() as u64,
            },
        });
    }
}
