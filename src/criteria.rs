//! # Evaluation Criteria
//!
//! The fixed criterion set and its orderings. These are process-wide
//! constants, never derived from input: the submission form produces
//! exactly the 15 canonical criteria, while stored evaluations may carry a
//! superset (the overview schema grew an `inclusao` key the form never
//! emits), so label lookups fall back to the raw id.
//!
//! Three orderings exist and must not be conflated: the canonical
//! 15-criterion order drives the report sections, the full bar chart and
//! the full flat export; the 9-criterion chart subset drives the compact
//! score-comparison chart; and the 9-criterion legacy order drives the
//! simplified CSV export. The two 9-entry lists coincide today but evolved
//! independently, so they stay separate constants.

use std::collections::BTreeMap;

/// The 15 submission criteria, in report and full-export order.
pub const CANONICAL_ORDER: [&str; 15] = [
    "professores",
    "alunos",
    "metodo",
    "estrutura",
    "limpeza",
    "convivencia",
    "esportes",
    "atividades",
    "distancia",
    "seguranca",
    "custos",
    "bolsas",
    "materiais",
    "cantina",
    "reputacao",
];

/// The 9 criteria shown in the compact score-comparison chart.
pub const CHART_SUBSET: [&str; 9] = [
    "professores",
    "metodo",
    "estrutura",
    "limpeza",
    "atividades",
    "distancia",
    "custos",
    "seguranca",
    "reputacao",
];

/// The 9 criteria of the legacy/simplified CSV export.
pub const LEGACY_EXPORT_ORDER: [&str; 9] = [
    "professores",
    "metodo",
    "estrutura",
    "limpeza",
    "atividades",
    "distancia",
    "custos",
    "seguranca",
    "reputacao",
];

/// The 9 score columns of the overview workbook, ending with the
/// stored-schema-only `inclusao`.
pub const OVERVIEW_EXPORT_ORDER: [&str; 9] = [
    "professores",
    "metodo",
    "estrutura",
    "atividades",
    "distancia",
    "custos",
    "seguranca",
    "reputacao",
    "inclusao",
];

/// Full display label for a criterion, as shown in the report sections.
/// Unknown ids fall back to the id itself.
pub fn label(id: &str) -> &str {
    match id {
        "professores" => "Qualidade dos professores",
        "alunos" => "Alunos por sala",
        "metodo" => "Método de ensino",
        "estrutura" => "Estrutura física",
        "limpeza" => "Limpeza geral",
        "convivencia" => "Espaço de convivência",
        "esportes" => "Espaço para esportes",
        "atividades" => "Atividades extracurriculares",
        "distancia" => "Distância e acesso",
        "seguranca" => "Segurança",
        "custos" => "Custos e taxas",
        "bolsas" => "Programas de bolsas",
        "materiais" => "Valor do material didático",
        "cantina" => "Cantina",
        "reputacao" => "Reputação",
        other => other,
    }
}

/// Compact label used by the chart blocks, the export column headers and
/// the overview score lines. Unknown ids fall back to the id itself.
pub fn short_label(id: &str) -> &str {
    match id {
        "professores" => "Professores",
        "alunos" => "Alunos por sala",
        "metodo" => "Método",
        "estrutura" => "Estrutura",
        "limpeza" => "Limpeza",
        "convivencia" => "Espaço de convivência",
        "esportes" => "Espaço para esportes",
        "atividades" => "Atividades",
        "distancia" => "Distância",
        "seguranca" => "Segurança",
        "custos" => "Custos",
        "bolsas" => "Programas de bolsas",
        "materiais" => "Valor do material didático",
        "cantina" => "Cantina",
        "reputacao" => "Reputação",
        "inclusao" => "Inclusão",
        other => other,
    }
}

/// Deterministic iteration order over a criterion-keyed map: canonical
/// criteria first, then any ids outside the canonical set in lexicographic
/// order. Stored evaluations use the superset schema, so unknown ids are
/// expected, not an error.
pub fn ordered_ids<T>(map: &BTreeMap<String, T>) -> Vec<&str> {
    let mut ids: Vec<&str> = CANONICAL_ORDER
        .iter()
        .copied()
        .filter(|id| map.contains_key(*id))
        .collect();
    for key in map.keys() {
        if !CANONICAL_ORDER.contains(&key.as_str()) {
            ids.push(key);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_is_complete_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for id in CANONICAL_ORDER {
            assert!(seen.insert(id), "duplicate criterion id {id}");
        }
        assert_eq!(seen.len(), 15);
    }

    #[test]
    fn test_subsets_are_drawn_from_the_canonical_set() {
        for id in CHART_SUBSET {
            assert!(CANONICAL_ORDER.contains(&id));
        }
        for id in LEGACY_EXPORT_ORDER {
            assert!(CANONICAL_ORDER.contains(&id));
        }
    }

    #[test]
    fn test_overview_order_carries_the_stored_only_criterion() {
        assert!(OVERVIEW_EXPORT_ORDER.contains(&"inclusao"));
        assert!(!CANONICAL_ORDER.contains(&"inclusao"));
        assert_eq!(short_label("inclusao"), "Inclusão");
    }

    #[test]
    fn test_unknown_id_falls_back_to_itself() {
        assert_eq!(label("novidade"), "novidade");
        assert_eq!(short_label("novidade"), "novidade");
    }

    #[test]
    fn test_ordered_ids_puts_unknown_keys_last() {
        let mut map = BTreeMap::new();
        map.insert("reputacao".to_string(), 1);
        map.insert("inclusao".to_string(), 2);
        map.insert("professores".to_string(), 3);
        assert_eq!(ordered_ids(&map), vec!["professores", "reputacao", "inclusao"]);
    }
}
