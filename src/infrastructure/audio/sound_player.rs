//! 録音アーティファクトの再生ユーティリティ。
//!
//! # 責任
//! - 音声ファイルのシステム再生（`afplay`）
//! - 再生状態のオブザーバー通知（登録・解除可能）
//! - 停止済み・未再生ハンドルへの `stop_audio` はノーオップ

use std::process::{Child, Command};
use std::sync::{Arc, Mutex};

/// 再生状態の通知イベント
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// 再生を開始した
    Started,
    /// 最後まで再生し終えた
    Finished,
    /// 呼び出し側の要求で停止した
    Stopped,
}

/// 再生状態を受け取るオブザーバー
pub trait PlaybackObserver: Send + Sync {
    fn on_status(&self, status: PlaybackStatus);
}

/// オブザーバー購読の識別子。解除に使用する。
pub type SubscriptionId = u64;

/// 進行中の再生ハンドル
///
/// 複数オブザーバーの購読・解除を受け付け、再生の開始・完走・停止を通知する。
pub struct Playback {
    child: Mutex<Option<Child>>,
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn PlaybackObserver>)>>,
    next_subscription: Mutex<SubscriptionId>,
}

impl Playback {
    fn new(child: Option<Child>) -> Self {
        Self {
            child: Mutex::new(child),
            observers: Mutex::new(Vec::new()),
            next_subscription: Mutex::new(0),
        }
    }

    /// オブザーバーを登録し、解除用のIDを返す
    pub fn subscribe(&self, observer: Arc<dyn PlaybackObserver>) -> SubscriptionId {
        let mut next = match self.next_subscription.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let id = *next;
        *next += 1;
        if let Ok(mut observers) = self.observers.lock() {
            observers.push((id, observer));
        }
        id
    }

    /// 登録済みオブザーバーを解除。未登録IDはノーオップ。
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut observers) = self.observers.lock() {
            observers.retain(|(sub_id, _)| *sub_id != id);
        }
    }

    /// 登録中のオブザーバー数
    pub fn observer_count(&self) -> usize {
        self.observers.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// 再生が既に終了・停止済みなら `true`
    pub fn is_done(&self) -> bool {
        self.child.lock().map(|c| c.is_none()).unwrap_or(true)
    }

    fn notify(&self, status: PlaybackStatus) {
        if let Ok(observers) = self.observers.lock() {
            for (_, observer) in observers.iter() {
                observer.on_status(status);
            }
        }
    }

    /// 再生プロセスを停止する。既に終了していればノーオップ。
    fn stop(&self) {
        let child = match self.child.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        };
        if let Some(mut child) = child {
            let _ = child.kill();
            let _ = child.wait();
            self.notify(PlaybackStatus::Stopped);
        }
    }

    /// ウォッチャースレッド用: プロセスの完走を待って通知する
    fn wait_for_finish(self: Arc<Self>) {
        loop {
            let done = {
                let mut guard = match self.child.lock() {
                    Ok(g) => g,
                    Err(_) => return,
                };
                match guard.as_mut() {
                    // stop() に先を越された場合は通知済み
                    None => return,
                    Some(child) => match child.try_wait() {
                        Ok(Some(_)) => {
                            *guard = None;
                            true
                        }
                        Ok(None) => false,
                        Err(_) => return,
                    },
                }
            };
            if done {
                self.notify(PlaybackStatus::Finished);
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
    }
}

/// 音声アーティファクトの再生を開始します。
///
/// 返されたハンドルにオブザーバーを購読させると、完走・停止の通知を受け取れる。
/// 開始通知は購読前に発火するため、開始イベントが必要な場合は
/// `play_audio_with` を使用する。
pub fn play_audio(locator: &str) -> std::io::Result<Arc<Playback>> {
    play_audio_with(locator, Vec::new())
}

/// オブザーバーを事前登録した上で再生を開始します。
pub fn play_audio_with(
    locator: &str,
    observers: Vec<Arc<dyn PlaybackObserver>>,
) -> std::io::Result<Arc<Playback>> {
    println!("Playing audio from: {}", locator);
    let child = Command::new("afplay").arg(locator).spawn()?;

    let playback = Arc::new(Playback::new(Some(child)));
    for observer in observers {
        playback.subscribe(observer);
    }
    playback.notify(PlaybackStatus::Started);

    // 完走を監視するウォッチャースレッド
    let watcher = playback.clone();
    std::thread::spawn(move || watcher.wait_for_finish());

    Ok(playback)
}

/// 再生を停止します。`None` や停止済みのハンドルに対してはノーオップ。
pub fn stop_audio(playback: Option<&Playback>) {
    if let Some(playback) = playback {
        playback.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        statuses: Mutex<Vec<PlaybackStatus>>,
        count: AtomicUsize,
    }

    impl CountingObserver {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(Vec::new()),
                count: AtomicUsize::new(0),
            })
        }
    }

    impl PlaybackObserver for CountingObserver {
        fn on_status(&self, status: PlaybackStatus) {
            self.statuses.lock().unwrap().push(status);
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 購読と解除が独立して機能する
    #[test]
    fn subscribe_and_unsubscribe_are_well_defined() {
        let playback = Playback::new(None);
        let a = CountingObserver::new();
        let b = CountingObserver::new();

        let id_a = playback.subscribe(a.clone());
        let _id_b = playback.subscribe(b.clone());
        assert_eq!(playback.observer_count(), 2);

        playback.notify(PlaybackStatus::Started);
        assert_eq!(a.count.load(Ordering::SeqCst), 1);
        assert_eq!(b.count.load(Ordering::SeqCst), 1);
        assert_eq!(*a.statuses.lock().unwrap(), vec![PlaybackStatus::Started]);

        playback.unsubscribe(id_a);
        assert_eq!(playback.observer_count(), 1);

        playback.notify(PlaybackStatus::Finished);
        assert_eq!(a.count.load(Ordering::SeqCst), 1);
        assert_eq!(b.count.load(Ordering::SeqCst), 2);

        // 未登録IDの解除はノーオップ
        playback.unsubscribe(999);
        assert_eq!(playback.observer_count(), 1);
    }

    /// 停止済みハンドルへの stop はノーオップ（通知も出ない）
    #[test]
    fn stop_on_finished_playback_is_noop() {
        let playback = Playback::new(None);
        let observer = CountingObserver::new();
        playback.subscribe(observer.clone());

        assert!(playback.is_done());
        stop_audio(Some(&playback));
        stop_audio(None);

        assert_eq!(observer.count.load(Ordering::SeqCst), 0);
    }
}
