use anyhow::Result;
use polyspell_core::{DetectionResult, LanguageGuess};
use whatlang::{Detector, Lang};

use crate::guesser::LanguageGuesser;

/// Trigram-based guesser backed by the `whatlang` crate.
pub struct WhatlangGuesser {
    detector: Detector,
}

impl Default for WhatlangGuesser {
    fn default() -> Self {
        Self::new()
    }
}

impl WhatlangGuesser {
    pub fn new() -> Self {
        Self {
            detector: Detector::new(),
        }
    }
}

impl LanguageGuesser for WhatlangGuesser {
    fn detect(&self, text: &str) -> Result<DetectionResult> {
        let Some(info) = self.detector.detect(text) else {
            return Ok(DetectionResult::unreliable());
        };
        let Some(code) = iso_639_1(info.lang()) else {
            return Ok(DetectionResult::unreliable());
        };

        let percent = (info.confidence() * 100.0).round().clamp(0.0, 100.0) as u8;
        Ok(DetectionResult {
            reliable: info.is_reliable(),
            languages: vec![LanguageGuess {
                code: code.to_string(),
                percent,
            }],
        })
    }
}

const ISO_639_1: &[(Lang, &str)] = &[
    (Lang::Afr, "af"),
    (Lang::Amh, "am"),
    (Lang::Ara, "ar"),
    (Lang::Aze, "az"),
    (Lang::Bel, "be"),
    (Lang::Ben, "bn"),
    (Lang::Bul, "bg"),
    (Lang::Cat, "ca"),
    (Lang::Ces, "cs"),
    (Lang::Cmn, "zh"),
    (Lang::Dan, "da"),
    (Lang::Deu, "de"),
    (Lang::Ell, "el"),
    (Lang::Eng, "en"),
    (Lang::Epo, "eo"),
    (Lang::Est, "et"),
    (Lang::Fin, "fi"),
    (Lang::Fra, "fr"),
    (Lang::Guj, "gu"),
    (Lang::Heb, "he"),
    (Lang::Hin, "hi"),
    (Lang::Hrv, "hr"),
    (Lang::Hun, "hu"),
    (Lang::Hye, "hy"),
    (Lang::Ind, "id"),
    (Lang::Ita, "it"),
    (Lang::Jav, "jv"),
    (Lang::Jpn, "ja"),
    (Lang::Kan, "kn"),
    (Lang::Kat, "ka"),
    (Lang::Khm, "km"),
    (Lang::Kor, "ko"),
    (Lang::Lat, "la"),
    (Lang::Lav, "lv"),
    (Lang::Lit, "lt"),
    (Lang::Mal, "ml"),
    (Lang::Mar, "mr"),
    (Lang::Mkd, "mk"),
    (Lang::Mya, "my"),
    (Lang::Nep, "ne"),
    (Lang::Nld, "nl"),
    (Lang::Nob, "nb"),
    (Lang::Ori, "or"),
    (Lang::Pan, "pa"),
    (Lang::Pes, "fa"),
    (Lang::Pol, "pl"),
    (Lang::Por, "pt"),
    (Lang::Ron, "ro"),
    (Lang::Rus, "ru"),
    (Lang::Sin, "si"),
    (Lang::Slk, "sk"),
    (Lang::Slv, "sl"),
    (Lang::Sna, "sn"),
    (Lang::Spa, "es"),
    (Lang::Srp, "sr"),
    (Lang::Swe, "sv"),
    (Lang::Tam, "ta"),
    (Lang::Tel, "te"),
    (Lang::Tgl, "tl"),
    (Lang::Tha, "th"),
    (Lang::Tuk, "tk"),
    (Lang::Tur, "tr"),
    (Lang::Ukr, "uk"),
    (Lang::Urd, "ur"),
    (Lang::Uzb, "uz"),
    (Lang::Vie, "vi"),
    (Lang::Yid, "yi"),
    (Lang::Zul, "zu"),
];

fn iso_639_1(lang: Lang) -> Option<&'static str> {
    ISO_639_1
        .iter()
        .find(|(candidate, _)| *candidate == lang)
        .map(|(_, code)| *code)
}
