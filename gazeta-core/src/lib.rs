//! # gazeta-core — Extração estrutural de Jornais Oficiais (gazetas)
//!
//! Este crate implementa um pipeline completo para extrair a estrutura de
//! Jornais Oficiais portugueses digitalizados por OCR: organismos,
//! documentos e as fatias de texto integral de cada diploma. Todo o sistema
//! é determinístico e baseado em regras, sem modelos treinados.
//!
//! ## Arquitetura do Sistema
//!
//! O sistema segue uma arquitetura de pipeline linear, onde o texto flui e é
//! transformado passo a passo:
//!
//! 1.  **Entrada**: Texto bruto do OCR (String).
//! 2.  **Normalização** ([`normalizer`]): Constrói o buffer canónico (NFKC,
//!     limpeza de glifos invisíveis) e a sombra normalizada com mapa de
//!     índices para a reancoragem.
//! 3.  **Deteção** ([`detector`]): Máquina de estados de linhas que emite
//!     spans ORG / ORG_SECUNDARIA / DOC com offsets absolutos.
//! 4.  **Relações** ([`relations`]): Grafo SAME_AS / CONTAINS /
//!     SECTION_ITEM / HAS_DOCUMENT sobre os spans.
//! 5.  **Segmentação** ([`segmenter`]): Corte Sumário/Corpo pela repetição
//!     de cabeçalhos e construção do roster de organismos.
//! 6.  **Reancoragem** ([`reanchor`]): Reencontra as frases do roster no
//!     corpo e fatia cada secção pelas âncoras DOC.
//! 7.  **Saída**: [`ExtractResult`] consolidado, ou o [`Bundle`] JSON com
//!     offsets absolutos ([`bundle`]).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use gazeta_core::{bundle, GazetaPipeline};
//!
//! // 1. Instancia o pipeline com a configuração padrão
//! let pipeline = GazetaPipeline::new();
//!
//! // 2. Texto de demonstração no formato dos Jornais Oficiais
//! let text = gazeta_core::samples::demo_texts()[0].1;
//!
//! // 3. Executa a extração completa
//! let result = pipeline.extract(text);
//!
//! // 4. Exibe as fatias do corpo pela ordem de leitura
//! for item in &result.body_items {
//!     println!("{}. {} / {}", item.order_index, item.org_text, item.doc_title);
//! }
//!
//! // 5. Ou monta o bundle JSON final
//! let bundle = bundle::assemble(&result);
//! assert_eq!(bundle.cut_index, result.roster.cut_index);
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: Orquestrador principal que conecta todos os estágios.
//! - [`normalizer`]: Normalização com preservação de offsets.
//! - [`segmenter`]: Corte Sumário/Corpo e roster.
//! - [`bundle`]: Montagem do JSON final com offsets absolutos.

pub mod bundle;
pub mod config;
pub mod detector;
pub mod normalizer;
pub mod pipeline;
pub mod reanchor;
pub mod relations;
pub mod samples;
pub mod segmenter;
pub mod span;

pub use bundle::Bundle;
pub use config::ExtractConfig;
pub use pipeline::{ExtractResult, GazetaPipeline, PipelineEvent};
pub use reanchor::BodyItem;
pub use relations::{RelationEdge, RelationKind};
pub use segmenter::{Roster, RosterOrg, Sumario};
pub use span::{EntityLabel, EntitySpan};
