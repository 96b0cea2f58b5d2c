//! Episode and window segmentation
//!
//! A client's probe requests are grouped into episodes: a new episode starts
//! whenever the gap to the previous probe request exceeds the threshold.
//! Window *k* is the open interval between the end of episode *k-1* and the
//! start of episode *k*; the first window is unbounded below.
//!
//! Every frame of the client's scope is then tagged with the window or the
//! episode it falls in. Frames after the last episode belong to neither and
//! are left out.

use tracing::debug;

use crate::capture::Frame;
use crate::wireless::MacAddr;

use super::epoch_filter::EpochFilter;

/// Where a frame falls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Segment {
    Window(u32),
    Episode(u32),
}

impl Segment {
    /// Position on the time axis: window 1, episode 1, window 2, ...
    fn rank(self) -> u64 {
        match self {
            Segment::Window(id) => 2 * u64::from(id),
            Segment::Episode(id) => 2 * u64::from(id) + 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    /// 1-based, increasing with time
    pub id: u32,
    pub start: f64,
    pub end: f64,
    /// Probe requests forming the episode
    pub probe_requests: usize,
    /// Mean time of those probe requests
    pub mean_epoch: f64,
}

impl Episode {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).abs()
    }

    pub fn contains(&self, epoch: f64) -> bool {
        epoch >= self.start && epoch <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Same as the id of the episode it precedes
    pub id: u32,
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn duration(&self) -> f64 {
        (self.end - self.start).abs()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TaggedFrame<'a> {
    pub segment: Segment,
    pub frame: &'a Frame,
}

/// Result of segmenting one client's frames
#[derive(Debug, Clone)]
pub struct Segmentation<'a> {
    pub episodes: Vec<Episode>,
    pub windows: Vec<Window>,
    /// Tagged frames, time-ascending; segment ranks never decrease
    pub frames: Vec<TaggedFrame<'a>>,
}

impl<'a> Segmentation<'a> {
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Contiguous ascending window ids, starting at 1
    pub fn window_ids(&self) -> Vec<u32> {
        self.windows.iter().map(|w| w.id).collect()
    }

    pub fn window(&self, id: u32) -> Option<&Window> {
        self.windows.get((id as usize).checked_sub(1)?)
    }

    pub fn episode(&self, id: u32) -> Option<&Episode> {
        self.episodes.get((id as usize).checked_sub(1)?)
    }

    pub fn window_frames(&self, id: u32) -> Vec<&'a Frame> {
        self.frames_in(Segment::Window(id))
    }

    pub fn episode_frames(&self, id: u32) -> Vec<&'a Frame> {
        self.frames_in(Segment::Episode(id))
    }

    fn frames_in(&self, segment: Segment) -> Vec<&'a Frame> {
        let rank = segment.rank();
        let start = self.frames.partition_point(|t| t.segment.rank() < rank);
        let end = start + self.frames[start..].partition_point(|t| t.segment.rank() == rank);
        self.frames[start..end].iter().map(|t| t.frame).collect()
    }

    /// Mean probe-request time of every episode, in id order
    pub fn episode_mean_epochs(&self) -> Vec<f64> {
        self.episodes.iter().map(|e| e.mean_epoch).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    gap_threshold: f64,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self { gap_threshold: 1.0 }
    }
}

impl Segmenter {
    pub fn new(gap_threshold: f64) -> Self {
        Self { gap_threshold }
    }

    pub fn gap_threshold(&self) -> f64 {
        self.gap_threshold
    }

    /// Segment a client's time-ascending frames.
    ///
    /// Returns `None` when the client has no probe requests (after the
    /// optional ground-truth filter).
    pub fn segment<'a>(
        &self,
        client: &MacAddr,
        frames: &[&'a Frame],
        epoch_filter: Option<&EpochFilter>,
    ) -> Option<Segmentation<'a>> {
        let mut probes: Vec<f64> = frames
            .iter()
            .filter(|f| f.is_probe_request() && f.is_from(client))
            .map(|f| f.time_epoch)
            .filter(|t| epoch_filter.map_or(true, |ef| ef.accepts(*t)))
            .collect();
        if probes.is_empty() {
            return None;
        }
        probes.sort_by(f64::total_cmp);

        let episodes = self.group(&probes);

        let first_frame = frames.iter().map(|f| f.time_epoch).fold(f64::INFINITY, f64::min);
        let windows: Vec<Window> = episodes
            .iter()
            .enumerate()
            .map(|(i, ep)| Window {
                id: ep.id,
                start: match i {
                    0 => first_frame.min(ep.start),
                    _ => episodes[i - 1].end,
                },
                end: ep.start,
            })
            .collect();

        let mut tagged: Vec<TaggedFrame<'a>> = frames
            .iter()
            .filter_map(|frame| {
                locate(&episodes, frame.time_epoch).map(|segment| TaggedFrame { segment, frame })
            })
            .collect();
        tagged.sort_by(|a, b| a.frame.time_epoch.total_cmp(&b.frame.time_epoch));

        debug!(
            client = %client,
            probe_requests = probes.len(),
            episodes = episodes.len(),
            tagged = tagged.len(),
            "segmented"
        );

        Some(Segmentation {
            episodes,
            windows,
            frames: tagged,
        })
    }

    fn group(&self, probes: &[f64]) -> Vec<Episode> {
        let mut episodes = Vec::new();
        let mut members: Vec<f64> = Vec::new();

        for &t in probes {
            if let Some(&last) = members.last() {
                if t - last > self.gap_threshold {
                    episodes.push(close_episode(episodes.len() as u32 + 1, &members));
                    members.clear();
                }
            }
            members.push(t);
        }
        if !members.is_empty() {
            episodes.push(close_episode(episodes.len() as u32 + 1, &members));
        }
        episodes
    }
}

fn close_episode(id: u32, members: &[f64]) -> Episode {
    let start = members.first().copied().unwrap_or(f64::NAN);
    let end = members.last().copied().unwrap_or(f64::NAN);
    Episode {
        id,
        start,
        end,
        probe_requests: members.len(),
        mean_epoch: members.iter().sum::<f64>() / members.len() as f64,
    }
}

fn locate(episodes: &[Episode], epoch: f64) -> Option<Segment> {
    // First episode not entirely before `epoch`
    let idx = episodes.partition_point(|e| e.end < epoch);
    let episode = episodes.get(idx)?;
    if epoch >= episode.start {
        Some(Segment::Episode(episode.id))
    } else {
        Some(Segment::Window(episode.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::tests::mac;

    const CLIENT: &str = "c0:ee:fb:30:d7:17";

    fn probe(t: f64) -> Frame {
        let mut f = Frame::new(t, 0x04, -50.0);
        f.source = Some(mac(CLIENT));
        f.transmitter = Some(mac(CLIENT));
        f.destination = Some(MacAddr::BROADCAST);
        f
    }

    fn null(t: f64) -> Frame {
        let mut f = Frame::new(t, 0x24, -50.0);
        f.source = Some(mac(CLIENT));
        f
    }

    fn scenario() -> Vec<Frame> {
        vec![
            null(99.0),
            probe(100.0),
            null(100.2),
            probe(100.3),
            probe(100.6),
            null(101.0),
            null(104.9),
            probe(105.0),
            probe(105.2),
            null(106.0),
        ]
    }

    #[test]
    fn test_two_episodes() {
        let frames = scenario();
        let refs: Vec<&Frame> = frames.iter().collect();
        let seg = Segmenter::default().segment(&mac(CLIENT), &refs, None).unwrap();

        assert_eq!(seg.episodes.len(), 2);
        assert_eq!((seg.episodes[0].start, seg.episodes[0].end), (100.0, 100.6));
        assert_eq!((seg.episodes[1].start, seg.episodes[1].end), (105.0, 105.2));
        assert_eq!(seg.window_ids(), vec![1, 2]);

        let w2: Vec<f64> = seg.window_frames(2).iter().map(|f| f.time_epoch).collect();
        assert_eq!(w2, vec![101.0, 104.9]);
        let e1: Vec<f64> = seg.episode_frames(1).iter().map(|f| f.time_epoch).collect();
        assert_eq!(e1, vec![100.0, 100.2, 100.3, 100.6]);

        let w1 = seg.window(1).unwrap();
        assert_eq!((w1.start, w1.end), (99.0, 100.0));
        let w2 = seg.window(2).unwrap();
        assert_eq!((w2.start, w2.end), (100.6, 105.0));
    }

    #[test]
    fn test_frames_after_last_episode_are_dropped() {
        let frames = scenario();
        let refs: Vec<&Frame> = frames.iter().collect();
        let seg = Segmenter::default().segment(&mac(CLIENT), &refs, None).unwrap();
        assert!(seg.frames.iter().all(|t| t.frame.time_epoch != 106.0));
        assert_eq!(seg.frames.len(), frames.len() - 1);
    }

    #[test]
    fn test_window_and_episode_are_exclusive() {
        let frames = scenario();
        let refs: Vec<&Frame> = frames.iter().collect();
        let seg = Segmenter::default().segment(&mac(CLIENT), &refs, None).unwrap();
        for id in seg.window_ids() {
            let w = seg.window_frames(id);
            let e = seg.episode_frames(id);
            assert!(w.iter().all(|f| !e.iter().any(|g| std::ptr::eq(*f, *g))));
        }
    }

    #[test]
    fn test_gap_invariant_and_disjointness() {
        let times = [0.0, 0.5, 1.5, 2.6, 2.7, 4.0, 4.9, 5.95, 7.0];
        let frames: Vec<Frame> = times.iter().map(|&t| probe(t)).collect();
        let refs: Vec<&Frame> = frames.iter().collect();
        let seg = Segmenter::new(1.0).segment(&mac(CLIENT), &refs, None).unwrap();

        for pair in seg.episodes.windows(2) {
            assert!(pair[0].end < pair[1].start);
            assert!(pair[1].start - pair[0].end > 1.0);
        }
        for ep in &seg.episodes {
            let members: Vec<f64> = times.iter().copied().filter(|t| ep.contains(*t)).collect();
            assert_eq!(members.len(), ep.probe_requests);
            for pair in members.windows(2) {
                assert!(pair[1] - pair[0] <= 1.0);
            }
        }
        let ids: Vec<u32> = seg.episodes.iter().map(|e| e.id).collect();
        assert_eq!(ids, (1..=seg.episodes.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_segment_lookup_matches_full_scan() {
        let mut frames = Vec::new();
        for i in 0..400 {
            let t = i as f64 * 0.05;
            // bursts of probe requests every 4 s, nulls in between
            if (t % 4.0) < 0.3 {
                frames.push(probe(t));
            } else {
                frames.push(null(t));
            }
        }
        let refs: Vec<&Frame> = frames.iter().collect();
        let seg = Segmenter::default().segment(&mac(CLIENT), &refs, None).unwrap();
        assert!(seg.episodes.len() > 3);

        let scan = |segment: Segment| -> Vec<f64> {
            seg.frames
                .iter()
                .filter(|t| t.segment == segment)
                .map(|t| t.frame.time_epoch)
                .collect()
        };
        let times = |frames: Vec<&Frame>| -> Vec<f64> { frames.iter().map(|f| f.time_epoch).collect() };
        for id in seg.window_ids() {
            assert_eq!(times(seg.window_frames(id)), scan(Segment::Window(id)));
            assert_eq!(times(seg.episode_frames(id)), scan(Segment::Episode(id)));
        }
        assert!(seg.window_frames(99).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let frames = scenario();
        let refs: Vec<&Frame> = frames.iter().collect();
        let a = Segmenter::default().segment(&mac(CLIENT), &refs, None).unwrap();
        let b = Segmenter::default().segment(&mac(CLIENT), &refs, None).unwrap();
        assert_eq!(a.episodes, b.episodes);
        let sa: Vec<Segment> = a.frames.iter().map(|t| t.segment).collect();
        let sb: Vec<Segment> = b.frames.iter().map(|t| t.segment).collect();
        assert_eq!(sa, sb);
    }

    #[test]
    fn test_no_probe_requests() {
        let frames = vec![null(1.0), null(2.0)];
        let refs: Vec<&Frame> = frames.iter().collect();
        assert!(Segmenter::default().segment(&mac(CLIENT), &refs, None).is_none());
    }

    #[test]
    fn test_epoch_filter_discards_unverified_bursts() {
        let frames = scenario();
        let refs: Vec<&Frame> = frames.iter().collect();
        let filter = EpochFilter::new(vec![105.1], 2.0);
        let seg = Segmenter::default().segment(&mac(CLIENT), &refs, Some(&filter)).unwrap();
        assert_eq!(seg.episodes.len(), 1);
        assert_eq!(seg.episodes[0].start, 105.0);
        // The discarded probe requests now sit in the window
        assert_eq!(seg.window_frames(1).len(), 7);
    }

    #[test]
    fn test_episode_mean_epoch() {
        let frames = scenario();
        let refs: Vec<&Frame> = frames.iter().collect();
        let seg = Segmenter::default().segment(&mac(CLIENT), &refs, None).unwrap();
        let means = seg.episode_mean_epochs();
        assert!((means[0] - 100.3).abs() < 1e-9);
        assert!((means[1] - 105.1).abs() < 1e-9);
    }
}
