//! Spoken announcements
//!
//! Speech is best effort: every backend failure is logged and dropped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub lang: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utterance {
    pub id: u64,
    pub text: String,
    pub lang: String,
    /// name of the selected voice, if any matched
    pub voice: Option<String>,
}

pub trait SpeechBackend: Send {
    /// Voices known so far; may be empty until the host has populated them
    fn voices(&self) -> Vec<Voice>;

    fn set_voices(&mut self, _voices: Vec<Voice>) {}

    fn speak(&mut self, utterance: Utterance) -> anyhow::Result<()>;

    /// Assigns a voice to an utterance already handed to [`SpeechBackend::speak`]
    fn update_voice(&mut self, _id: u64, _voice: &Voice) -> anyhow::Result<()> {
        Ok(())
    }

    /// Utterances waiting to be picked up by a remote speaker
    fn drain(&mut self) -> Vec<Utterance> {
        Vec::new()
    }
}

/// Queues utterances for the browser page, which speaks them with
/// `speechSynthesis` and reports its voice list back.
#[derive(Default)]
pub struct ClientSpeech {
    voices: Vec<Voice>,
    queue: Vec<Utterance>,
}

impl SpeechBackend for ClientSpeech {
    fn voices(&self) -> Vec<Voice> {
        self.voices.clone()
    }

    fn set_voices(&mut self, voices: Vec<Voice>) {
        self.voices = voices;
    }

    fn speak(&mut self, utterance: Utterance) -> anyhow::Result<()> {
        self.queue.push(utterance);
        Ok(())
    }

    fn update_voice(&mut self, id: u64, voice: &Voice) -> anyhow::Result<()> {
        if let Some(u) = self.queue.iter_mut().find(|u| u.id == id) {
            u.voice = Some(voice.name.clone());
        }
        Ok(())
    }

    fn drain(&mut self) -> Vec<Utterance> {
        std::mem::take(&mut self.queue)
    }
}

/// Writes announcements to the log
pub struct LogSpeech;

impl SpeechBackend for LogSpeech {
    fn voices(&self) -> Vec<Voice> {
        Vec::new()
    }

    fn speak(&mut self, utterance: Utterance) -> anyhow::Result<()> {
        log::info!("[{}] {}", utterance.lang, utterance.text);
        Ok(())
    }
}

pub struct Announcer {
    lang: String,
    backend: Option<Box<dyn SpeechBackend>>,
    awaiting_voice: Vec<u64>,
    next_id: u64,
}

impl Announcer {
    pub fn new(lang: impl Into<String>, backend: Option<Box<dyn SpeechBackend>>) -> Self {
        Self {
            lang: lang.into(),
            backend,
            awaiting_voice: Vec::new(),
            next_id: 0,
        }
    }

    /// Announcer that never says anything
    pub fn silent() -> Self {
        Self::new("", None)
    }

    /// Voice whose language is the configured locale or its primary subtag
    fn select_voice<'a>(lang: &str, voices: &'a [Voice]) -> Option<&'a Voice> {
        let primary = lang.split('-').next().unwrap_or(lang);
        voices
            .iter()
            .find(|v| v.lang == lang)
            .or_else(|| voices.iter().find(|v| v.lang == primary))
    }

    pub fn speak(&mut self, text: &str) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        let id = self.next_id;
        self.next_id += 1;

        let voices = backend.voices();
        let voice = Self::select_voice(&self.lang, &voices);
        if voices.is_empty() {
            self.awaiting_voice.push(id);
        }

        let utterance = Utterance {
            id,
            text: text.to_string(),
            lang: self.lang.clone(),
            voice: voice.map(|v| v.name.clone()),
        };

        if let Err(e) = backend.speak(utterance) {
            log::warn!("speech synthesis failed: {e:#}");
        }
    }

    /// Called once the host has populated its voice list.
    ///
    /// Utterances spoken while no voices were known get a voice now.
    pub fn voices_changed(&mut self, voices: Vec<Voice>) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        backend.set_voices(voices.clone());

        let Some(voice) = Self::select_voice(&self.lang, &voices) else {
            return;
        };
        for id in std::mem::take(&mut self.awaiting_voice) {
            if let Err(e) = backend.update_voice(id, voice) {
                log::warn!("could not assign voice {}: {e:#}", voice.name);
            }
        }
    }

    /// Hands queued utterances to the caller.
    ///
    /// Drained utterances can no longer get a voice, so nothing stays parked.
    pub fn drain(&mut self) -> Vec<Utterance> {
        self.awaiting_voice.clear();
        self.backend
            .as_mut()
            .map(|b| b.drain())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use super::*;

    fn voice(name: &str, lang: &str) -> Voice {
        Voice {
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }

    struct BrokenSpeech;

    impl SpeechBackend for BrokenSpeech {
        fn voices(&self) -> Vec<Voice> {
            vec![voice("x", "pt-BR")]
        }

        fn speak(&mut self, _utterance: Utterance) -> anyhow::Result<()> {
            bail!("synthesizer crashed")
        }
    }

    fn client_announcer(voices: Vec<Voice>) -> Announcer {
        let mut backend = ClientSpeech::default();
        backend.set_voices(voices);
        Announcer::new("pt-BR", Some(Box::new(backend)))
    }

    #[test]
    fn test_exact_locale_preferred() {
        let mut announcer =
            client_announcer(vec![voice("generic", "pt"), voice("brazil", "pt-BR")]);
        announcer.speak("ok");

        let spoken = announcer.drain();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].voice.as_deref(), Some("brazil"));
        assert_eq!(spoken[0].lang, "pt-BR");
    }

    #[test]
    fn test_primary_subtag_fallback() {
        let mut announcer = client_announcer(vec![voice("en", "en-US"), voice("generic", "pt")]);
        announcer.speak("ok");
        assert_eq!(announcer.drain()[0].voice.as_deref(), Some("generic"));
    }

    #[test]
    fn test_no_matching_voice_still_speaks() {
        let mut announcer = client_announcer(vec![voice("en", "en-US")]);
        announcer.speak("ok");

        let spoken = announcer.drain();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].voice, None);
    }

    #[test]
    fn test_voice_assigned_when_voices_arrive() {
        let mut announcer = client_announcer(vec![]);
        announcer.speak("ok");
        announcer.voices_changed(vec![voice("brazil", "pt-BR")]);

        let spoken = announcer.drain();
        assert_eq!(spoken[0].voice.as_deref(), Some("brazil"));
    }

    #[test]
    fn test_drained_utterances_are_not_parked() {
        let mut announcer = client_announcer(vec![]);
        announcer.speak("one");
        announcer.speak("two");
        assert_eq!(announcer.awaiting_voice.len(), 2);

        let spoken = announcer.drain();
        assert_eq!(spoken.len(), 2);
        assert!(announcer.awaiting_voice.is_empty());

        announcer.speak("three");
        announcer.voices_changed(vec![voice("brazil", "pt-BR")]);
        let spoken = announcer.drain();
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].voice.as_deref(), Some("brazil"));
        assert!(announcer.awaiting_voice.is_empty());
    }

    #[test]
    fn test_backend_failure_is_swallowed() {
        let mut announcer = Announcer::new("pt-BR", Some(Box::new(BrokenSpeech)));
        announcer.speak("ok");
        assert!(announcer.drain().is_empty());
    }

    #[test]
    fn test_silent_announcer_does_nothing() {
        let mut announcer = Announcer::silent();
        announcer.speak("ok");
        announcer.voices_changed(vec![voice("brazil", "pt-BR")]);
        assert!(announcer.drain().is_empty());
    }
}
