//! Editor menu actions rendered into the `userPrompt` of a `menu` relay request.

/// Builds the instruction for one editor action applied to the selected `text`.
///
/// `option` picks a variant (`summarize` + `bullets`, `translate` + `en`, ...); unknown
/// options fall back to the generic wording of the action, and unknown actions return
/// `text` unchanged. For `freeform` the option is the user's own instruction.
///
/// # Examples
///
/// ```
/// use inkstream::actions::build_action_prompt;
///
/// let prompt = build_action_prompt("translate", "こんにちは", Some("en"));
/// assert_eq!(prompt, "以下の文章を英語に翻訳してください:\n\n\"こんにちは\"");
/// assert_eq!(build_action_prompt("unknown", "そのまま", None), "そのまま");
/// ```
pub fn build_action_prompt(action: &str, text: &str, option: Option<&str>) -> String {
    let instruction = match (action, option) {
        ("freeform", _) => {
            let request = option.unwrap_or_default();
            if text.is_empty() {
                return request.to_string();
            }
            return format!("以下の文章について、{request}\n\n対象の文章:\n\"{text}\"");
        }

        ("summarize", Some("short")) => "以下の文章を短い文章で要約した文章を作成してください",
        ("summarize", Some("medium")) => "以下の文章を1段落に要約してください",
        ("summarize", Some("bullets")) => "以下の文章を箇条書きで要約してください",
        ("summarize", _) => "以下の文章を要約してください",

        ("translate", Some("en")) => "以下の文章を英語に翻訳してください",
        ("translate", Some("zh")) => "以下の文章を中国語に翻訳してください",
        ("translate", Some("ko")) => "以下の文章を韓国語に翻訳してください",
        ("translate", Some("ja")) => "以下の文章を日本語に翻訳してください",
        ("translate", _) => "以下の文章の翻訳を行ってください",

        ("tone", Some("casual")) => "以下の文章をカジュアルな文体に変更してください",
        ("tone", Some("formal")) => "以下の文章をフォーマルな文体に変更してください",
        ("tone", Some("business")) => "以下の文章をビジネスライクな文体に変更してください",
        ("tone", _) => "以下の文章の文体を変更してください",

        ("continue", _) => "以下の続きの文章を、同じ文体とトーンを保って執筆してください",
        ("grammarCheck", _) => {
            "以下の文章の文法と綴りをチェックし、必要に応じた修正案を示してください"
        }

        ("paraphrase", Some("casual")) => "以下の文章をカジュアルな表現に言い換えてください",
        ("paraphrase", Some("formal")) => "以下の文章をフォーマルな表現に言い換えてください",
        ("paraphrase", _) => "以下の文章を別の表現で言い換えてください",

        ("title", _) => {
            "以下の文章に基づいて、キャッチーで魅力的なタイトルを生成してください"
        }

        ("restructure", Some("article")) => {
            "以下の文章を一般記事向けに、1.はじめに、2.目次、3.目次の詳細記事の構成にしてください。見出し、段落分け、文章の流れに注意を払い、一般読者にも理解しやすい形に整理してください"
        }
        ("restructure", Some("academic")) => {
            "以下の文章を学術論文形式で再構成してください。序論、本論、結論の構成を明確にし、論理的な展開と客観的な表現を心がけ、参考文献や引用の形式にも配慮してください"
        }
        ("restructure", Some("report")) => {
            "以下の文章をビジネス報告書形式で再構成してください。目的、現状分析、課題、解決策、まとめの順で構成し、簡潔で正確な表現を使用してください"
        }
        ("restructure", Some("blog")) => {
            "以下の文章を絵文字を使ったキャッチーなブログ記事形式で再構成してください。読者の興味を引く導入、わかりやすい見出し、適度な改行、親しみやすい表現を用いて、読みやすい形に整理してください"
        }
        ("restructure", Some("newsletter")) => {
            "以下の文章をメールマガジン形式で再構成してください。読者への語りかけを意識し、重要なポイントを強調し、スキャンしやすい構成と簡潔な表現を心がけてください"
        }
        ("restructure", _) => "以下の文章をより読みやすくなるように再構成してください",

        ("creativeExtend", _) => {
            "以下の文章に創造的なアイディアや独自の表現を追加して、内容を拡充してください"
        }
        ("improveVocabulary", _) => {
            "以下の文章の語彙を、文脈に適したより豊かな表現に改善してください"
        }
        ("removeRedundancy", _) => {
            "以下の文章から冗長な表現や重複する内容を削除し、簡潔に修正してください"
        }
        ("unifyStyle", _) => "以下の文章の文体を一貫性のあるスタイルに統一してください",

        _ => return text.to_string(),
    };
    format!("{instruction}:\n\n\"{text}\"")
}
