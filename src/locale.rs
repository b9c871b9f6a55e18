//! Installer language settings and the translation capability.
//!
//! Nothing here touches process-wide locale state; a `Locale` value and a
//! `Translator` are handed to whichever stage needs display strings.

/// Language settings for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locale {
    /// ISO language code the build was requested in.
    pub code: &'static str,
    /// Language name understood by the packaging tool.
    pub nsis_name: &'static str,
    /// Windows code page.
    pub code_page: u16,
    /// POSIX locale without the charset suffix.
    pub posix: &'static str,
}

const FALLBACK: Locale = Locale {
    code: "en",
    nsis_name: "English",
    code_page: 1252,
    posix: "en_GB",
};

const fn lang(code: &'static str, nsis_name: &'static str, code_page: u16, posix: &'static str) -> Locale {
    Locale {
        code,
        nsis_name,
        code_page,
        posix,
    }
}

static LANGUAGES: &[Locale] = &[
    FALLBACK,
    lang("fr", "French", 1252, "fr_FR"),
    lang("de", "German", 1252, "de_DE"),
    lang("es", "SpanishInternational", 1252, "es_ES"),
    lang("it", "Italian", 1252, "it_IT"),
    lang("nl", "Dutch", 1252, "nl_NL"),
    lang("sv", "Swedish", 1252, "sv_SE"),
    lang("fi", "Finnish", 1252, "fi_FI"),
    lang("pl", "Polish", 1250, "pl_PL"),
    lang("ca", "Catalan", 1252, "ca_ES"),
    lang("sr", "SerbianLatin", 1250, "sr_RS@latin"),
    lang("hr", "Croatian", 1250, "hr_HR"),
    lang("sl", "Slovenian", 1250, "sl_SI"),
    lang("da", "Danish", 1252, "da_DK"),
    lang("nb", "Norwegian", 1252, "nb_NO"),
    lang("nn", "NorwegianNynorsk", 1252, "nn_NO"),
    lang("el", "Greek", 1253, "el_GR"),
    lang("ru", "Russian", 1251, "ru_RU"),
    lang("pt", "Portuguese", 1252, "pt_PT"),
    lang("uk", "Ukrainian", 1251, "uk_UA"),
    lang("cs", "Czech", 1250, "cs_CZ"),
    lang("sk", "Slovak", 1250, "sk_SK"),
    lang("bg", "Bulgarian", 1251, "bg_BG"),
    lang("hu", "Hungarian", 1250, "hu_HU"),
    lang("ro", "Romanian", 1250, "ro_RO"),
    lang("lv", "Latvian", 1257, "lv_LV"),
    lang("mk", "Macedonian", 1251, "mk_MK"),
    lang("et", "Estonian", 1257, "et_EE"),
    lang("tr", "Turkish", 1254, "tr_TR"),
    lang("lt", "Lithuanian", 1257, "lt_LT"),
    lang("ar", "Arabic", 1256, "ar_AR"),
    lang("he", "Hebrew", 1255, "he_IL"),
    lang("id", "Indonesian", 1252, "id_ID"),
    lang("mn", "Mongolian", 1251, "mn_MN"),
    lang("sq", "Albanian", 1252, "sq_AL"),
    lang("br", "Breton", 1252, "br_FR"),
    lang("be", "Belarusian", 1251, "be_BY"),
    lang("is", "Icelandic", 1252, "is_IS"),
    lang("ms", "Malay", 1252, "ms_MY"),
    lang("bs", "Bosnian", 1250, "bs_BA"),
    lang("ga", "Irish", 1250, "ga_IE"),
    lang("uz", "Uzbek", 1251, "uz_UZ"),
    lang("gl", "Galician", 1252, "gl_ES"),
    lang("af", "Afrikaans", 1252, "af_ZA"),
    lang("ast", "Asturian", 1252, "ast_ES"),
];

impl Locale {
    /// Settings for a language code. Unknown codes get English.
    pub fn for_code(code: &str) -> Self {
        let code = code.trim();
        // Accept "de_DE.UTF-8" and "de-AT" as well as "de"
        let short = code
            .split(['_', '-', '.'])
            .next()
            .unwrap_or(code)
            .to_ascii_lowercase();
        LANGUAGES
            .iter()
            .find(|l| l.code == short)
            .copied()
            .unwrap_or(FALLBACK)
    }
}

impl Default for Locale {
    fn default() -> Self {
        FALLBACK
    }
}

/// Localization capability: "translate string S for locale L".
pub trait Translator {
    /// Translate a display string.
    fn translate(&self, text: &str, locale: &Locale) -> String;

    /// Translate a packaging-script template. Defaults to per-string translation
    /// of the whole document.
    fn translate_template(&self, template: &str, locale: &Locale) -> String {
        self.translate(template, locale)
    }
}

/// Returns every string unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughTranslator;

impl Translator for PassthroughTranslator {
    fn translate(&self, text: &str, _locale: &Locale) -> String {
        text.to_string()
    }
}
