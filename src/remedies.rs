use std::collections::HashMap;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Static advisory text for one disease label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemedyRecord {
    pub description: String,
    pub management: Vec<String>,
    pub solutions: Vec<String>,
}

fn record(description: &str, management: &[&str], solutions: &[&str]) -> RemedyRecord {
    RemedyRecord {
        description: description.to_string(),
        management: management.iter().map(|s| s.to_string()).collect(),
        solutions: solutions.iter().map(|s| s.to_string()).collect(),
    }
}

lazy_static! {
    static ref REMEDY_TABLE: HashMap<&'static str, RemedyRecord> = {
        let mut table = HashMap::new();
        table.insert(
            "bacterial_leaf_blight",
            record(
                "Bacterial Leaf Blight is a serious bacterial disease that can significantly reduce yield.",
                &[
                    "Use certified, disease-free seeds and resistant rice varieties.",
                    "Avoid water stagnation and ensure good field drainage.",
                    "Maintain proper plant spacing to improve air flow.",
                ],
                &[
                    "Introduce resistant rice varieties in endemic areas.",
                    "Follow balanced fertilizer application based on soil testing.",
                    "Implement integrated pest and disease management.",
                    "Schedule regular scouting to detect early symptoms.",
                ],
            ),
        );
        table.insert(
            "brown_spot",
            record(
                "Brown Spot is caused by the fungus Cochliobolus miyabeanus and affects seedlings to maturity stage.",
                &[
                    "Apply protective fungicides like Mancozeb or Carbendazim.",
                    "Ensure well-drained fields and avoid waterlogging.",
                    "Improve soil fertility by applying balanced NPK fertilizers and organic compost.",
                    "Avoid dense planting and ensure adequate sunlight penetration.",
                ],
                &[
                    "Avoid water stress during seedling stage.",
                    "Use high-quality seeds to prevent initial infection.",
                    "Rotate crops with non-host plants to break disease cycle.",
                ],
            ),
        );
        table.insert(
            "healthy",
            record(
                "The plant appears healthy and shows no visible signs of disease.",
                &[
                    "Conduct routine field inspections.",
                    "Apply balanced fertilizers at recommended stages.",
                    "Use crop rotation to minimize pest and disease build-up.",
                    "Ensure proper water management and avoid over-irrigation.",
                ],
                &[
                    "Maintain integrated crop management practices.",
                    "Ensure timely irrigation and nutrient supply.",
                    "Protect against pests preventatively.",
                ],
            ),
        );
        table.insert(
            "hispa",
            record(
                "Hispa (Dicladispa armigera) is a rice leaf insect pest that scrapes chlorophyll and feeds on leaf tissue.",
                &[
                    "Manually pick and destroy larvae and adult beetles.",
                    "Spray insecticides such as Chlorpyrifos 20 EC (2.5 ml/L) or Quinalphos during early infestation.",
                    "Avoid excess nitrogen use which attracts Hispa.",
                    "Encourage natural predators like ladybird beetles and spiders.",
                ],
                &[
                    "Destroy crop residues after harvest to kill pupae.",
                    "Avoid staggered planting to break pest cycle.",
                    "Encourage biological control through predators.",
                ],
            ),
        );
        table.insert(
            "leaf_blast",
            record(
                "Leaf Blast is a destructive fungal disease caused by Magnaporthe oryzae, affecting leaves, nodes, and panicles.",
                &[
                    "Use blast-resistant rice varieties (e.g., IR64, BPT5204).",
                    "Apply Tricyclazole 75 WP at 0.6g/L when symptoms appear.",
                    "Avoid high doses of nitrogen especially during early tillering.",
                ],
                &[
                    "Ensure good water management to avoid drought stress.",
                    "Spray fungicides preventively in blast-prone areas.",
                    "Plant resistant cultivars adapted to local climate.",
                ],
            ),
        );
        table.insert(
            "leaf_scald",
            record(
                "Leaf Scald is caused by the fungus Microdochium oryzae, and typically appears as straw-colored lesions.",
                &[
                    "Apply Potassium-based balanced fertilizers to increase plant vigor.",
                    "Avoid excessive nitrogen which promotes soft tissue prone to infection.",
                    "Remove infected leaves and improve air circulation between rows.",
                    "Apply Propiconazole or Azoxystrobin fungicides if disease is severe.",
                ],
                &[
                    "Maintain field hygiene and remove alternate hosts.",
                    "Avoid excessive nitrogen use.",
                    "Apply foliar fungicides early at disease onset.",
                ],
            ),
        );
        table.insert(
            "narrow_brown_spot",
            record(
                "Narrow Brown Spot (Cercospora oryzae) affects rice during reproductive stages, causing narrow brown lesions on leaves.",
                &[
                    "Spray fungicides like Propiconazole or Hexaconazole during early detection.",
                    "Grow tolerant varieties suited for humid environments.",
                    "Avoid heavy irrigation during late growth stages.",
                ],
                &[
                    "Ensure timely irrigation but avoid waterlogging.",
                    "Use recommended fungicides based on severity.",
                    "Adopt resistant or tolerant cultivars.",
                ],
            ),
        );
        table.insert(
            "tungro",
            record(
                "Tungro is a viral disease transmitted by green leafhoppers (Nephotettix virescens), causing stunted growth and yellowing.",
                &[
                    "Plant Tungro-tolerant or resistant rice varieties like UPLRi-5, PSBRc82.",
                    "Control leafhopper vectors using insecticides such as Imidacloprid or Thiamethoxam.",
                    "Remove infected plants immediately to reduce disease spread.",
                ],
                &[
                    "Destroy infected crop residues promptly.",
                    "Synchronize planting across the region.",
                    "Monitor vector populations using sticky traps.",
                ],
            ),
        );
        table
    };
}

/// Case-insensitive lookup against the static table. Total: unknown labels
/// get the fixed placeholder record.
pub fn get_remedy(disease: &str) -> RemedyRecord {
    REMEDY_TABLE
        .get(disease.to_lowercase().as_str())
        .cloned()
        .unwrap_or_else(|| {
            record(
                "No remedy information available.",
                &["Please consult an agricultural expert."],
                &[],
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(get_remedy("healthy"), get_remedy("HEALTHY"));
        assert_eq!(get_remedy("Leaf_Blast"), get_remedy("leaf_blast"));
    }

    #[test]
    fn known_labels_return_their_records() {
        let healthy = get_remedy("healthy");
        assert_eq!(
            healthy.description,
            "The plant appears healthy and shows no visible signs of disease."
        );
        assert_eq!(healthy.management.len(), 4);
        assert_eq!(healthy.solutions.len(), 3);
    }

    #[test]
    fn unknown_labels_return_the_placeholder() {
        let fallback = get_remedy("definitely_not_a_disease");
        assert_eq!(fallback.description, "No remedy information available.");
        assert_eq!(
            fallback.management,
            vec!["Please consult an agricultural expert.".to_string()]
        );
        assert!(fallback.solutions.is_empty());
    }

    #[test]
    fn every_class_label_has_a_record() {
        for label in [
            "bacterial_leaf_blight",
            "brown_spot",
            "healthy",
            "hispa",
            "leaf_blast",
            "leaf_scald",
            "narrow_brown_spot",
            "tungro",
        ] {
            let remedy = get_remedy(label);
            assert_ne!(remedy.description, "No remedy information available.");
            assert!(!remedy.management.is_empty());
        }
    }
}
