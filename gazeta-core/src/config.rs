//! # Configuração do pipeline de extração
//!
//! Todos os limiares empíricos do sistema vivem aqui como valores ajustáveis,
//! nunca como constantes enterradas nos módulos. Os valores padrão refletem a
//! afinação feita sobre edições reais do Jornal Oficial; quem processa gazetas
//! com diagramação diferente pode sobrescrevê-los por documento.

use serde::{Deserialize, Serialize};

/// Limiares ajustáveis do pipeline.
///
/// A configuração é passada explicitamente a cada estágio — não há estado
/// global — o que mantém o processamento de documentos independentes
/// trivialmente paralelizável.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Máximo de linhas de um cabeçalho ORG (linha inicial + continuações).
    /// Cobre com folga cabeçalhos de 2–3 linhas.
    pub max_header_lines: usize,
    /// Máximo de linhas de continuação absorvidas por um ORG_SECUNDARIA.
    pub max_suborg_continuation_lines: usize,
    /// Mínimo de tokens de conteúdo (não-funcionais) para promover uma linha
    /// toda em maiúsculas a ORG_SECUNDARIA.
    pub min_content_tokens: usize,
    /// Linhas inspecionadas à frente à procura de "Contrato de sociedade"
    /// quando a linha candidata a ORG_SECUNDARIA é curta demais.
    pub lookahead_lines: usize,
    /// Janela máxima (em bytes) entre um ORG_SECUNDARIA e um DOC para emitir
    /// a relação HAS_DOCUMENT.
    pub has_document_window: usize,
    /// Janela de retrocesso (em bytes) antes do fim do ORG ao reprocurar DOCs
    /// que "sangram" para antes do cabeçalho detectado.
    pub doc_lookback: usize,
    /// Mínimo de tokens partilhados para que a repetição de um cabeçalho ORG
    /// (por prefixo de tokens) marque o início do Corpo.
    pub min_shared_prefix_tokens: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_header_lines: 4,
            max_suborg_continuation_lines: 2,
            min_content_tokens: 4,
            lookahead_lines: 2,
            has_document_window: 300,
            doc_lookback: 120,
            min_shared_prefix_tokens: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let cfg = ExtractConfig::default();
        assert_eq!(cfg.max_header_lines, 4);
        assert_eq!(cfg.has_document_window, 300);
        assert_eq!(cfg.doc_lookback, 120);
        assert_eq!(cfg.min_shared_prefix_tokens, 5);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let cfg: ExtractConfig = serde_json::from_str(r#"{"doc_lookback": 200}"#).unwrap();
        assert_eq!(cfg.doc_lookback, 200);
        assert_eq!(cfg.min_content_tokens, 4);
    }
}
