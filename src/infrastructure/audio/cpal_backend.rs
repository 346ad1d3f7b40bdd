use super::CaptureBackend;
use cpal::{
    Device, SampleFormat, Stream, StreamConfig,
    traits::{DeviceTrait, HostTrait, StreamTrait},
};
use hound::{SampleFormat as WavFmt, WavWriter};
use std::{
    error::Error,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

/// CPAL によるローカルマイク入力実装。
/// WAV ファイルを `/tmp` 相当の一時ディレクトリに保存します。
pub struct CpalCaptureBackend {
    /// ランタイム中の入力ストリーム
    stream: Mutex<Option<Stream>>,
    /// 録音フラグ
    recording: Arc<AtomicBool>,
    /// 出力 WAV パス
    output_path: Mutex<Option<String>>,
}

impl Default for CpalCaptureBackend {
    fn default() -> Self {
        Self {
            stream: Mutex::new(None),
            recording: Arc::new(AtomicBool::new(false)),
            output_path: Mutex::new(None),
        }
    }
}

/// `INPUT_DEVICE_PRIORITY` 環境変数を解釈し、優先順位の高い入力デバイスを選択します。
fn select_input_device(host: &cpal::Host) -> Option<Device> {
    use std::env;

    // 1) 優先リスト取得 (カンマ区切り)
    let priorities: Vec<String> = match env::var("INPUT_DEVICE_PRIORITY") {
        Ok(v) => v
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    };

    // 2) 利用可能なデバイスを列挙
    let available: Vec<Device> = host.input_devices().ok()?.collect();

    // 3) 優先度順に一致デバイスを探す
    for want in &priorities {
        if let Some(dev) = available
            .iter()
            .find(|d| d.name().map(|n| n == *want).unwrap_or(false))
        {
            println!("🎙️  Using preferred device: {}", want);
            return Some(dev.clone());
        }
    }

    // 4) 見つからなければデフォルト
    host.default_input_device()
}

// =============== 内部ユーティリティ ================================
impl CpalCaptureBackend {
    /// `/tmp/voice_notes_<epoch>.wav` 形式の一意なファイルパスを生成
    fn make_output_path() -> Result<String, Box<dyn Error>> {
        let ts = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let mut p = std::env::temp_dir();
        p.push(format!("voice_notes_{ts}.wav"));
        Ok(p.to_string_lossy().into_owned())
    }

    /// CPAL ストリームを構築。サンプルを WAV ライターに書き込みます。
    fn build_input_stream(
        recording: Arc<AtomicBool>,
        device: &Device,
        config: &StreamConfig,
        sample_format: SampleFormat,
        output_path: String,
    ) -> Result<Stream, Box<dyn Error>> {
        // WAV ヘッダ
        let spec = hound::WavSpec {
            channels: config.channels,
            sample_rate: config.sample_rate.0,
            bits_per_sample: 16,
            sample_format: WavFmt::Int,
        };
        let writer = Arc::new(Mutex::new(WavWriter::create(&output_path, spec)?));

        let stream = match sample_format {
            SampleFormat::I16 => device.build_input_stream(
                config,
                move |data: &[i16], _| {
                    if recording.load(Ordering::SeqCst) {
                        if let Ok(mut w) = writer.lock() {
                            for &s in data {
                                let _ = w.write_sample(s);
                            }
                        }
                    }
                },
                |e| eprintln!("stream error: {e}"),
                None,
            )?,
            SampleFormat::F32 => device.build_input_stream(
                config,
                move |data: &[f32], _| {
                    if recording.load(Ordering::SeqCst) {
                        if let Ok(mut w) = writer.lock() {
                            for &s in data {
                                let _ = w.write_sample((s * i16::MAX as f32) as i16);
                            }
                        }
                    }
                },
                |e| eprintln!("stream error: {e}"),
                None,
            )?,
            _ => return Err("unsupported sample format".into()),
        };

        Ok(stream)
    }
}

impl CaptureBackend for CpalCaptureBackend {
    /// マイク許可を確認します。
    ///
    /// CoreAudio は初回ストリームオープン時にOSの許可ダイアログを出すため、
    /// ここでは入力デバイスが見えるかどうかを許可の代理指標とします。
    fn request_permission(&self) -> Result<bool, Box<dyn Error>> {
        let host = cpal::default_host();
        match host.input_devices() {
            Ok(mut devices) => Ok(devices.next().is_some()),
            Err(_) => Ok(false),
        }
    }

    /// 録音ストリームを開始します。
    fn start(&self) -> Result<(), Box<dyn Error>> {
        if self.is_recording() {
            return Err("already recording".into());
        }

        // ホスト・デバイス取得
        let host = cpal::default_host();
        let device = select_input_device(&host)
            .ok_or("no input device available (check INPUT_DEVICE_PRIORITY)")?;

        let supported = device.default_input_config()?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.into();

        // 出力パス生成 & ストリーム構築
        let wav_path = Self::make_output_path()?;
        let stream = Self::build_input_stream(
            self.recording.clone(),
            &device,
            &config,
            sample_format,
            wav_path.clone(),
        )?;
        stream.play()?;

        self.recording.store(true, Ordering::SeqCst);
        *self.stream.lock().map_err(|e| e.to_string())? = Some(stream);
        *self.output_path.lock().map_err(|e| e.to_string())? = Some(wav_path);
        Ok(())
    }

    /// 録音を停止し、WAV ファイルパスを返します。
    /// 失敗経路でもストリームと録音フラグは必ず解放します。
    fn stop(&self) -> Result<String, Box<dyn Error>> {
        if !self.is_recording() {
            return Err("not recording".into());
        }

        // どの経路で抜けてもデバイスリソースを解放する
        let recording = self.recording.clone();
        let _release = scopeguard::guard((), |_| {
            recording.store(false, Ordering::SeqCst);
        });

        // ストリームを解放して終了
        *self.stream.lock().map_err(|e| e.to_string())? = None;

        let path = self
            .output_path
            .lock()
            .map_err(|e| e.to_string())?
            .take()
            .ok_or("output path not set")?;
        Ok(path)
    }

    /// 録音中かどうかを確認します。
    fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }
}
