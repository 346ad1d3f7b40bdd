//! 環境変数ファイルの読み込み
//!
//! # 責任
//! - `.env`（または `VOICE_NOTES_ENV_PATH` が指すファイル）の読み込み
//! - `EnvConfig::init()` より前に一度だけ呼ばれることを想定
//!
//! ファイルが無い・読めない場合は黙って無視する。APIキー等を
//! プロセス環境で直接渡す運用も許容するため、失敗をエラーにしない。

/// 環境変数ファイルを読み込む
pub fn load_env() {
    match std::env::var("VOICE_NOTES_ENV_PATH") {
        Ok(path) => {
            dotenvy::from_path(path).ok();
        }
        Err(_) => {
            dotenvy::dotenv().ok();
        }
    }
}
