//! Fixed classification lexicons and thresholds
//!
//! Lexicons are ordered: the first category whose keyword matches wins.
//! All matching is case-insensitive substring matching against the
//! lowercased input text.

/// Ad count above which a signal is considered to be scaling.
pub const SCALING_THRESHOLD: i64 = 30;

/// Default ad count when no digit run is found in the count hint.
pub const DEFAULT_AD_COUNT: i64 = 1;

/// Niche lexicon for descriptive copy.
pub const NICHE_LEXICON: &[(&str, &[&str])] = &[
    ("Saúde & Bem-estar", &["saúde", "dieta", "emagrecer", "fit", "corpo", "workout", "gym"]),
    ("Finanças & Investimentos", &["dinheiro", "lucro", "investimento", "milhas", "finanças", "crypto"]),
    ("iGaming & Apostas", &["aposta", "bet", "tiger", "cassino", "jogo", "slot"]),
    ("E-commerce & Dropshipping", &["loja", "frete", "comprar", "entrega", "oferta", "desconto"]),
    ("Infoprodutos & Educação", &["curso", "mentor", "aula", "vender", "marketing"]),
];

/// Fallback niche when nothing in the lexicon matches.
pub const NICHE_FALLBACK: &str = "Negócios";

/// Region lexicon: (display name, ISO-ish code, keywords).
pub const REGION_LEXICON: &[(&str, &str, &[&str])] = &[
    ("Brasil", "BR", &["brazil", "brasil", " br"]),
    ("Estados Unidos", "US", &["usa", "united states", " us"]),
    ("Colômbia", "CO", &["colombia"]),
    ("Paraguai", "PY", &["paraguay", "py"]),
];

/// Fallback region when nothing matches.
pub const REGION_FALLBACK: (&str, &str) = ("Brasil", "BR");

/// Media URL endings that classify a creative as video.
pub const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".webm"];

/// Page scanner niche lexicon (matched against lowercased page text).
pub const SCAN_NICHE_LEXICON: &[(&str, &[&str])] = &[
    ("BLACK", &["suplemento", "libido", "renda extra", "investimento", "apostas", "cassino"]),
    ("SAÚDE", &["emagrecer", "dieta", "pele", "cabelo", "dor", "natural"]),
    ("TECH", &["software", "app", "ai", "curso", "digital", "ebook"]),
    ("E-COM", &["frete grátis", "oferta", "desconto", "loja", "comprar"]),
];

/// Fallback scanner niche.
pub const SCAN_NICHE_FALLBACK: &str = "Outros";

/// Technology platform markers: (substring in raw markup, platform label).
pub const TECH_MARKERS: &[(&str, &str)] = &[
    ("shopify", "Shopify"),
    ("wp-content", "WordPress"),
    ("vtex", "VTEX"),
    ("ticto", "Ticto"),
    ("kiwify", "Kiwify"),
];

/// Platform label when no marker is found.
pub const TECH_FALLBACK: &str = "Custom";
