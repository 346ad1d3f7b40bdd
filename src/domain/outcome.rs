//! 外部サービス呼び出しの二値結果型
//!
//! 「呼び出しは成功したが結果が空だった」（無音・要約なし）と
//! 「呼び出し自体が失敗した」（トランスポート/APIエラー）を
//! 型で区別する。後者は `VoiceNotesError` として伝播する。

/// 転写サービスの成功時結果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transcription {
    /// 音声から得られた転写テキスト（非空）
    Text(String),
    /// サービスが結果ゼロ件を返した（無音検出）。エラーではない。
    NoSpeech,
}

impl Transcription {
    /// サービス応答のテキストから結果を構築。空文字列は無音扱い。
    pub fn from_text(text: String) -> Self {
        if text.is_empty() {
            Transcription::NoSpeech
        } else {
            Transcription::Text(text)
        }
    }

    /// テキストがあれば取り出す
    pub fn into_text(self) -> Option<String> {
        match self {
            Transcription::Text(t) => Some(t),
            Transcription::NoSpeech => None,
        }
    }
}

/// 要約サービスの成功時結果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Summary {
    /// 生成された要約テキスト（非空）
    Text(String),
    /// サービスが本文なしの応答を返した。エラーではない。
    Empty,
}

impl Summary {
    /// サービス応答のテキストから結果を構築。空文字列は本文なし扱い。
    pub fn from_text(text: String) -> Self {
        if text.is_empty() {
            Summary::Empty
        } else {
            Summary::Text(text)
        }
    }

    /// テキストがあれば取り出す
    pub fn into_text(self) -> Option<String> {
        match self {
            Summary::Text(t) => Some(t),
            Summary::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 空文字列は負の結果へ正規化される
    #[test]
    fn empty_text_normalizes_to_negative_outcome() {
        assert_eq!(Transcription::from_text(String::new()), Transcription::NoSpeech);
        assert_eq!(
            Transcription::from_text("hello".into()),
            Transcription::Text("hello".into())
        );
        assert_eq!(Summary::from_text(String::new()), Summary::Empty);
        assert_eq!(Summary::from_text("sum".into()), Summary::Text("sum".into()));
    }

    /// into_text は負の結果で None
    #[test]
    fn into_text_distinguishes_outcomes() {
        assert_eq!(Transcription::NoSpeech.into_text(), None);
        assert_eq!(Summary::Text("s".into()).into_text(), Some("s".into()));
    }
}
