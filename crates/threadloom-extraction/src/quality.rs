//! Deterministic heuristic quality scorer. No LLM calls. Weights differ by
//! article type; threshold and max-retry are shared.

use threadloom_core::{Classification, CompiledArticle, QualityReport, MAX_RETRIES, QUALITY_THRESHOLD};

/// Scores a compiled article in `[0,1]`, rounded to two decimals. `None`
/// scores zero.
pub fn score(article: Option<&CompiledArticle>) -> f64 {
    let Some(article) = article else {
        return 0.0;
    };

    let total = if article.article_type == Classification::Troubleshooting {
        score_troubleshooting(article)
    } else {
        score_non_troubleshooting(article)
    };

    (total.min(1.0) * 100.0).round() / 100.0
}

fn score_troubleshooting(a: &CompiledArticle) -> f64 {
    let mut total = 0.0;

    total += match a.solution.len() {
        n if n > 200 => 0.25,
        n if n > 100 => 0.15,
        n if n > 50 => 0.08,
        _ => 0.0,
    };

    total += match a.code_snippet.as_deref().map(str::len) {
        Some(n) if n > 50 => 0.20,
        Some(n) if n > 0 => 0.10,
        _ => 0.0,
    };

    total += (a.confidence * 0.20).min(0.20);

    total += match a.tags.len() {
        n if n >= 5 => 0.15,
        n if n >= 3 => 0.10,
        n if n >= 1 => 0.05,
        _ => 0.0,
    };

    total += match a.diagnosis.len() {
        n if n > 80 => 0.10,
        n if n > 30 => 0.05,
        _ => 0.0,
    };

    if a.thread_summary.len() > 10 {
        total += 0.10;
    }

    total
}

fn score_non_troubleshooting(a: &CompiledArticle) -> f64 {
    let mut total = 0.0;

    total += match a.solution.len() {
        n if n > 200 => 0.35,
        n if n > 100 => 0.25,
        n if n > 50 => 0.15,
        _ => 0.0,
    };

    total += (a.confidence * 0.20).min(0.20);

    total += match a.tags.len() {
        n if n >= 5 => 0.15,
        n if n >= 3 => 0.10,
        n if n >= 1 => 0.05,
        _ => 0.0,
    };

    total += match a.diagnosis.len() {
        n if n > 80 => 0.15,
        n if n > 30 => 0.08,
        _ => 0.0,
    };

    if a.thread_summary.len() > 10 {
        total += 0.10;
    }

    if a.code_snippet.as_deref().map(str::len).unwrap_or(0) > 50 {
        total += 0.05;
    }

    total
}

/// Advances the retry counter per the quality-gate routing rule: `score
/// >= threshold` or `retries_used >= max_retries` is terminal.
pub fn advance(score: f64, retries_used: u32) -> QualityReport {
    let retries_used = if score < QUALITY_THRESHOLD {
        retries_used + 1
    } else {
        retries_used
    };
    QualityReport { score, retries_used }
}

pub fn should_retry(report: &QualityReport) -> bool {
    report.score < QUALITY_THRESHOLD && report.retries_used < MAX_RETRIES
}
