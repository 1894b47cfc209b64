//! User-agent matching against curated bot families.

use std::sync::LazyLock;

use engine_core::BotType;
use regex::Regex;
use woothee::parser::Parser;

/// One curated user-agent family.
struct UaFamily {
    bot_type: BotType,
    confidence: u8,
    tag: &'static str,
    pattern: Regex,
}

fn family(bot_type: BotType, confidence: u8, tag: &'static str, pattern: &str) -> UaFamily {
    UaFamily {
        bot_type,
        confidence,
        tag,
        pattern: Regex::new(pattern).expect("invalid user-agent pattern"),
    }
}

/// Shared woothee parser for the crawler-category fallback.
static PARSER: LazyLock<Parser> = LazyLock::new(Parser::new);

/// Checked in order; the first match wins. Specific families come before
/// the generic crawler catch-all.
static FAMILIES: LazyLock<Vec<UaFamily>> = LazyLock::new(|| {
    vec![
        family(
            BotType::SearchEngine,
            98,
            "ua_search_engine",
            r"(?i)googlebot|bingbot|slurp|duckduckbot|baiduspider|yandex(bot|images)|applebot|sogou|exabot|petalbot|seznambot",
        ),
        family(
            BotType::SeoTool,
            97,
            "ua_seo_tool",
            r"(?i)ahrefsbot|semrushbot|mj12bot|dotbot|rogerbot|screaming frog|serpstatbot|blexbot|dataforseobot",
        ),
        family(
            BotType::Social,
            95,
            "ua_social",
            r"(?i)facebookexternalhit|facebot|twitterbot|linkedinbot|slackbot|discordbot|whatsapp|telegrambot|pinterestbot|redditbot",
        ),
        family(
            BotType::Monitoring,
            95,
            "ua_monitoring",
            r"(?i)uptimerobot|pingdom|statuscake|site24x7|newrelicpinger|datadog|better uptime|freshping",
        ),
        family(
            BotType::Automation,
            95,
            "ua_automation",
            r"(?i)headlesschrome|headless|selenium|webdriver|puppeteer|playwright|phantomjs|slimerjs|cypress",
        ),
        family(
            BotType::Scraper,
            95,
            "ua_scraper",
            r"(?i)^curl/|^wget/|python-requests|python-urllib|aiohttp|scrapy|go-http-client|libwww-perl|java/|okhttp|axios/|node-fetch|httpclient|guzzlehttp",
        ),
        family(BotType::Crawler, 90, "ua_crawler", r"(?i)bot\b|crawl|spider|scan"),
    ]
});

/// Confidence for a crawler found only by the UA parser.
const PARSER_CRAWLER_CONFIDENCE: u8 = 85;
/// Subscore for a missing or empty user agent.
const EMPTY_UA_SCORE: u8 = 60;
/// Subscore for a user agent too short to come from a real browser.
const SHORT_UA_SCORE: u8 = 40;
const SHORT_UA_LEN: usize = 20;

/// A family match from the user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UaMatch {
    pub bot_type: BotType,
    pub confidence: u8,
}

/// User-agent analysis: a 0-100 subscore, an optional family match, and the
/// signal tags that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UaAnalysis {
    pub score: u8,
    pub matched: Option<UaMatch>,
    pub signals: Vec<String>,
}

/// Analyses one user-agent string.
pub fn analyze_user_agent(user_agent: Option<&str>) -> UaAnalysis {
    let ua = user_agent.map(str::trim).unwrap_or_default();
    if ua.is_empty() {
        return UaAnalysis {
            score: EMPTY_UA_SCORE,
            matched: None,
            signals: vec!["empty_user_agent".to_string()],
        };
    }

    if let Some(f) = FAMILIES.iter().find(|f| f.pattern.is_match(ua)) {
        return UaAnalysis {
            score: f.confidence,
            matched: Some(UaMatch {
                bot_type: f.bot_type,
                confidence: f.confidence,
            }),
            signals: vec![f.tag.to_string()],
        };
    }

    if PARSER.parse(ua).is_some_and(|r| r.category == "crawler") {
        return UaAnalysis {
            score: PARSER_CRAWLER_CONFIDENCE,
            matched: Some(UaMatch {
                bot_type: BotType::Crawler,
                confidence: PARSER_CRAWLER_CONFIDENCE,
            }),
            signals: vec!["ua_parser_crawler".to_string()],
        };
    }

    if ua.len() < SHORT_UA_LEN && !ua.starts_with("Mozilla/") {
        return UaAnalysis {
            score: SHORT_UA_SCORE,
            matched: None,
            signals: vec!["short_user_agent".to_string()],
        };
    }

    UaAnalysis::default()
}
