// Fixed values for the assistant, with env-derived defaults where an operator may
// want to point somewhere else.

use std::env;

lazy_static::lazy_static! {
    pub static ref INFERENCE_URL: String = env::var("SECOURS_INFERENCE_URL")
        .unwrap_or_else(|_| "https://api-inference.huggingface.co/models/microsoft/DialoGPT-medium".to_string());
    pub static ref TEMPLATES_DIR: String = env::var("SECOURS_TEMPLATES_DIR").unwrap_or_else(|_| "templates".to_string());
    pub static ref STATIC_DIR: String = env::var("SECOURS_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
}

/// Env variable holding the bearer credential for the inference endpoint.
pub const API_KEY_ENV: &str = "HUGGINGFACE_API_KEY";

pub const DEFAULT_PORT: u16 = 9900;
/// Conversations kept by the web server before the oldest are dropped.
pub const MAX_SESSIONS: usize = 256;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RESPONSE_DELAY_MS: u64 = 2000;

// Generation parameters sent with every remote request.
pub const MAX_NEW_TOKENS: u32 = 500;
pub const TEMPERATURE: f32 = 0.3;
pub const DO_SAMPLE: bool = true;
pub const TOP_P: f32 = 0.9;
pub const RETURN_FULL_TEXT: bool = false;

/// Substrings that flag a remote answer as an emergency.
pub const EMERGENCY_TRIGGERS: [&str; 3] = ["18", "urgence", "pompiers"];

pub const SYSTEM_INSTRUCTION: &str = "Tu es un assistant médical d'urgence français. Réponds en français avec des conseils de premiers secours précis et clairs. Si c'est une urgence vitale, mentionne d'appeler le 18.";

pub const GREETING: &str = "🚨 Assistant de premiers secours activé avec IA médicale MedAlpaca.\n\nVous pouvez :\n• Décrire une situation d'urgence pour des conseils immédiats\n• Poser des questions médicales générales\n• Utiliser les suggestions rapides ci-dessous\n\nEn cas d'urgence vitale immédiate, appelez le  18 !";

/// Prepended to the local advisory when the resolution itself broke down.
pub const DEGRADED_PREFIX: &str = "❌ Erreur lors du traitement. Utilisation des conseils de base.\n\n";

pub const EMERGENCY_CALL_NOTICE: &str = "🚨 Composition du 18\n\nEn situation réelle, votre téléphone composerait automatiquement le 18.\n\nInformations à donner:\n- Votre localisation exacte\n- Nature de l'urgence\n- État de la victime\n- Votre numéro de téléphone";

pub const DISCLAIMER: &str = "Cet assistant ne remplace pas un avis médical professionnel. En cas d'urgence vitale, composez immédiatement le 18 (Pompiers). Les conseils fournis par l'IA MedAlpaca sont basés sur l'apprentissage automatique et doivent être confirmés par un professionnel de santé.";

pub const LOADING_HINT_REMOTE: &str = "IA médicale en analyse...";
pub const LOADING_HINT_LOCAL: &str = "Analyse en cours...";

pub const SUGGESTIONS: [&str; 7] = [
    "Une personne s'étouffe",
    "Saignement abondant",
    "Perte de conscience",
    "Douleur à la poitrine",
    "Brûlure importante",
    "Que faire en cas de fracture ?",
    "Comment reconnaître un AVC ?",
];

/// Builds the full prompt sent to the model for one question.
pub fn build_prompt(question: &str) -> String {
    format!("{}\n\nQuestion: {}\n\nRéponse:", SYSTEM_INSTRUCTION, question)
}
