//! Local first-aid advice table and keyword lookup.
//!
//! Used whenever the remote model is unavailable. Lookup is total: an input that
//! matches nothing gets the general advice.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmergencyCategory {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
    pub advisory: &'static str,
    pub is_emergency: bool,
}

/// Match order is significant: the first category with a hit wins.
pub static CATEGORIES: &[EmergencyCategory] = &[
    EmergencyCategory {
        name: "etouffement",
        keywords: &["étouffe", "etouff", "avale", "respire plus", "obstruction"],
        advisory: "🚨 URGENCE - ÉTOUFFEMENT:\n\n1.  Appelez le  18 immédiatement \n2. Si la personne peut encore tousser → Encouragez-la à tousser\n3. Si elle ne peut plus tousser :\n   • Adulte: 5 claques dans le dos + compression abdominale (manœuvre de Heimlich)\n   • Bébé: Tête en bas, 5 claques entre omoplates\n4. Alternez jusqu'à désobstruction ou arrivée secours",
        is_emergency: true,
    },
    EmergencyCategory {
        name: "inconscience",
        keywords: &["inconscient", "evanoui", "sans connaissance", "ne répond pas"],
        advisory: "🚨 URGENCE - PERTE DE CONSCIENCE:\n\n1.  Appelez le  18 immédiatement \n2. Vérifiez la respiration (10 secondes max)\n3. Si elle respire: Position Latérale de Sécurité (PLS)\n4. Si elle ne respire pas: Massage cardiaque + bouche-à-bouche\n5. Restez avec la personne jusqu'aux secours",
        is_emergency: true,
    },
    EmergencyCategory {
        name: "saignement",
        keywords: &["saigne", "sang", "hémorragie", "coupure", "blessure"],
        advisory: "🩸 SAIGNEMENT IMPORTANT:\n\n1.  Si saignement abondant → Appelez le  18 \n2. Compression directe avec tissu propre\n3. Surélevez le membre si possible\n4. Ne retirez JAMAIS un objet planté\n5. Point de compression si nécessaire\n6. Surveillez les signes de choc",
        is_emergency: false,
    },
    EmergencyCategory {
        name: "brulure",
        keywords: &["brûlure", "brule", "feu", "eau chaude", "vapeur"],
        advisory: "🔥 BRÛLURE:\n\n1.  Si étendue/grave → Appelez le  18 \n2. Refroidir immédiatement (eau froide  18-20min)\n3. Retirer bijoux/vêtements non collés\n4. Ne PAS percer les cloques\n5. Couvrir avec linge propre\n6. Surveiller signes de choc",
        is_emergency: false,
    },
    EmergencyCategory {
        name: "malaise",
        keywords: &["malaise", "douleur poitrine", "crise cardiaque", "avc", "vertiges"],
        advisory: "💔 MALAISE/DOULEUR THORACIQUE:\n\n1.  Appelez le  18 immédiatement \n2. Installez en position demi-assise\n3. Desserrez les vêtements\n4. Ne donnez rien à boire/manger\n5. Rassurez et surveillez constamment\n6. Préparez-vous à la réanimation si nécessaire",
        is_emergency: true,
    },
    EmergencyCategory {
        name: "fracture",
        keywords: &["fracture", "cassé", "entorse", "douleur os", "déformé"],
        advisory: "🦴 FRACTURE/ENTORSE:\n\n1. Ne bougez pas la zone blessée\n2. Immobilisez avec attelle improvisée\n3. Appliquez froid (pas directement sur peau)\n4.  Si fracture ouverte/déformation → Appelez le  18 \n5. Surveillez circulation en aval\n6. Transport médicalisé si nécessaire",
        is_emergency: false,
    },
];

/// Returned when no keyword matches.
pub static GENERAL: EmergencyCategory = EmergencyCategory {
    name: "general",
    keywords: &[],
    advisory: "⚠️ Situation non identifiée automatiquement.\n\nConseils généraux:\n1. Évaluez la gravité\n2. Si doute → Appelez le 18\n3. Sécurisez la zone\n4. Ne bougez pas la victime sauf danger\n5. Surveillez les constantes vitales\n\n En cas d'urgence vitale, appelez toujours le 18 ",
    is_emergency: false,
};

impl EmergencyCategory {
    pub fn is_general(&self) -> bool {
        self.name == GENERAL.name
    }

    /// Keywords are stored lower-case, so callers pass lower-cased text.
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|keyword| lowered.contains(keyword))
    }
}

/// Result of one local lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalAdvice {
    pub category: &'static EmergencyCategory,
    pub advisory: &'static str,
    pub is_emergency: bool,
}

pub struct KeywordMatcher;

impl KeywordMatcher {
    pub fn match_text(text: &str) -> LocalAdvice {
        let lowered = text.to_lowercase();
        let category = CATEGORIES
            .iter()
            .find(|category| category.matches(&lowered))
            .unwrap_or(&GENERAL);

        tracing::debug!(category = category.name, "Local advice table matched");

        LocalAdvice {
            category,
            advisory: category.advisory,
            is_emergency: category.is_emergency,
        }
    }

    /// The ordered table, without the general fallback.
    pub fn categories() -> &'static [EmergencyCategory] {
        CATEGORIES
    }
}
