//! Textos de demonstração: excertos sintéticos no formato dos Jornais
//! Oficiais, com sumário seguido do corpo que repete os cabeçalhos.

/// Excerto com dois organismos, cada um com um documento no sumário e o
/// texto integral no corpo.
pub const DEMO_DESPACHOS: &str = "SUMÁRIO\n\
SECRETARIA REGIONAL DOS RECURSOS HUMANOS\n\
Despacho n.º 12/2020\n\
Autoriza a renovação da comissão de serviço.\n\
SECRETARIA REGIONAL DO PLANO E FINANÇAS\n\
Aviso n.º 3/2020\n\
Lista de candidatos admitidos ao procedimento concursal.\n\
SECRETARIA REGIONAL DOS RECURSOS HUMANOS\n\
Despacho n.º 12/2020\n\
Texto integral do despacho que renova a comissão de serviço\n\
do técnico superior do quadro regional.\n\
SECRETARIA REGIONAL DO PLANO E FINANÇAS\n\
Aviso n.º 3/2020\n\
Texto integral do aviso com a lista de candidatos admitidos.\n";

/// Excerto de registo comercial: conservatória com suborganismo (a firma)
/// e contrato de sociedade.
pub const DEMO_REGISTO_COMERCIAL: &str = "CONSERVATÓRIA DO REGISTO COMERCIAL DO FUNCHAL\n\
EMPRESA AZUL TURISMO E VIAGENS LDA\n\
Contrato de sociedade\n\
Entre os sócios foi constituída a sociedade comercial por quotas.\n\
CONSERVATÓRIA DO REGISTO COMERCIAL DO FUNCHAL\n\
EMPRESA AZUL TURISMO E VIAGENS LDA\n\
Contrato de sociedade\n\
Texto integral do contrato de sociedade da empresa, com a firma,\n\
a sede e o capital social integralmente realizado.\n";

/// Pares `(título, texto)` para a UI de demonstração.
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Despachos e avisos", DEMO_DESPACHOS),
        ("Registo comercial", DEMO_REGISTO_COMERCIAL),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_texts_non_empty() {
        let demos = demo_texts();
        assert_eq!(demos.len(), 2);
        for (title, text) in demos {
            assert!(!title.is_empty());
            assert!(text.ends_with('\n'));
        }
    }
}
