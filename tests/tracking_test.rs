use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ndarray::Array1;
use trackwalker::scoring::{IdDistance, PositionDistance};
use trackwalker::{
    CamId, CandidateSource, Detection, DetectionBuilder, DetectionId, FrameObject, InMemorySource,
    MemorySourceError, ObjectId, ObjectKind, ScoreFn, Timestamp, Track, TrackId, TrackIdAllocator,
    Walker, WalkerConfig,
};

fn det(id: u64, timestamp: Timestamp, x: f64, y: f64) -> Detection {
    DetectionBuilder::new(id).timestamp(timestamp).xy(x, y).build()
}

fn source_with_frames(frames: std::ops::RangeInclusive<Timestamp>) -> InMemorySource {
    let mut source = InMemorySource::new();
    for t in frames {
        source.add_frame(0, t);
    }
    source
}

fn member_ids(tracks: &[Track]) -> Vec<Vec<u64>> {
    tracks.iter().map(|track| track.ids.clone()).collect()
}

/// Low cost only for extending the track that ends in `from` with `to`.
fn pair_cost(
    from: u64,
    to: u64,
) -> ScoreFn<impl Fn(&[&Track], &[&FrameObject]) -> Array1<f64>> {
    ScoreFn::new(move |tracks: &[&Track], candidates: &[&FrameObject]| {
        tracks
            .iter()
            .zip(candidates)
            .map(|(track, candidate)| {
                if track.ids.last() == Some(&from) && candidate.id() == ObjectId::Detection(to) {
                    0.1
                } else {
                    1000.0
                }
            })
            .collect()
    })
}

#[test]
fn test_single_detection_becomes_single_track() {
    let mut source = source_with_frames(0..=4);
    source.add_detection(det(1, 0, 0.0, 0.0));
    let config = WalkerConfig::default().with_frame_diff(2).with_radius(1000.0);

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1]]);
    assert_eq!(tracks[0].timestamps, vec![0]);
    assert_eq!(tracks[0].id, TrackId::new(0));
}

#[test]
fn test_detection_extends_track() {
    let mut source = source_with_frames(0..=2);
    source.extend_detections([det(1, 0, 0.0, 0.0), det(2, 1, 1.0, 1.0)]);
    let config = WalkerConfig::default().with_frame_diff(2).with_radius(10.0);

    let mut walker = Walker::new(source, pair_cost(1, 2), config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1, 2]]);
    assert_eq!(tracks[0].timestamps, vec![0, 1]);
    assert_eq!(tracks[0].detections().len(), 2);
}

#[test]
fn test_gap_longer_than_frame_diff_splits_tracks() {
    let mut source = source_with_frames(0..=5);
    source.extend_detections([det(1, 0, 0.0, 0.0), det(2, 4, 1.0, 1.0)]);
    let config = WalkerConfig::default().with_frame_diff(2).with_radius(10.0);

    let mut walker = Walker::new(source, pair_cost(1, 2), config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1], vec![2]]);
}

#[test]
fn test_track_survives_exactly_frame_diff_frames() {
    // last update at index 0, frame_diff 2: still open at index 2, closed at 3
    for (gap, expected) in [
        (2, vec![vec![1, 2]]),
        (3, vec![vec![1], vec![2]]),
    ] {
        let mut source = source_with_frames(0..=5);
        source.extend_detections([det(1, 0, 0.0, 0.0), det(2, gap, 1.0, 0.0)]);
        let config = WalkerConfig::default().with_frame_diff(2).with_radius(10.0);

        let mut walker = Walker::new(source, PositionDistance, config);
        let tracks = walker.calc_tracks(None, None).unwrap();
        assert_eq!(member_ids(&tracks), expected, "gap of {} frames", gap);
    }
}

#[test]
fn test_lower_cost_candidate_wins() {
    let mut source = source_with_frames(0..=1);
    source.extend_detections([
        det(1, 0, 0.0, 0.0),
        det(2, 1, 1.0, 0.0),
        det(3, 1, 2.0, 0.0),
    ]);
    let config = WalkerConfig::default().with_radius(10.0);

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1, 2], vec![3]]);
}

#[test]
fn test_assignment_is_globally_optimal() {
    // Greedy would give 1 -> 3 (cost 1) and 2 -> 4 (cost 4.5).
    let mut source = source_with_frames(0..=1);
    source.extend_detections([
        det(1, 0, 0.0, 0.0),
        det(2, 0, 2.5, 0.0),
        det(3, 1, 1.0, 0.0),
        det(4, 1, -2.0, 0.0),
    ]);
    let config = WalkerConfig::default().with_radius(100.0);

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1, 4], vec![2, 3]]);
}

#[test]
fn test_pruned_costs_are_never_applied() {
    let mut source = source_with_frames(0..=1);
    source.extend_detections([det(1, 0, 0.0, 0.0), det(2, 1, 500.0, 0.0)]);
    let config = WalkerConfig::default()
        .with_radius(1000.0)
        .with_prune_weight(400.0);

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1], vec![2]]);
}

#[test]
fn test_detections_outside_radius_start_new_tracks() {
    let mut source = source_with_frames(0..=1);
    source.extend_detections([det(1, 0, 0.0, 0.0), det(2, 1, 30.0, 40.0)]);
    let config = WalkerConfig::default().with_radius(49.0);

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1], vec![2]]);
}

#[test]
fn test_start_and_stop_are_half_open() {
    let mut source = InMemorySource::new();
    source.extend_detections((0..6).map(|t| det(t + 1, t, t as f64, 0.0)));
    let config = WalkerConfig::default().with_radius(10.0);

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(Some(2), Some(4)).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![3, 4]]);
}

#[test]
fn test_cameras_are_walked_independently() {
    let mut source = InMemorySource::new();
    for cam_id in 0..2 {
        for t in 0..3 {
            let id = u64::from(cam_id) * 10 + t;
            source.add_detection(
                DetectionBuilder::new(id)
                    .timestamp(t)
                    .cam_id(cam_id)
                    .xy(5.0, 5.0)
                    .build(),
            );
        }
    }
    let config = WalkerConfig::default().with_track_prefix("run_");

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![0, 1, 2], vec![10, 11, 12]]);
    let ids: Vec<String> = tracks.iter().map(|track| track.id.to_string()).collect();
    assert_eq!(ids, vec!["run_0", "run_1"]);
}

#[test]
fn test_shared_allocator_keeps_ids_unique() {
    let ids = Arc::new(TrackIdAllocator::new(Some("shared_".to_string())));
    let mut all_ids = HashSet::new();

    for _ in 0..2 {
        let mut source = InMemorySource::new();
        source.extend_detections([det(1, 0, 0.0, 0.0), det(2, 0, 500.0, 0.0)]);
        let mut walker = Walker::with_id_allocator(
            source,
            PositionDistance,
            WalkerConfig::default(),
            Arc::clone(&ids),
        );
        for track in walker.calc_tracks(None, None).unwrap() {
            assert!(all_ids.insert(track.id));
        }
    }

    assert_eq!(all_ids.len(), 4);
    assert_eq!(ids.issued(), 4);
}

/// Five objects per camera drifting to the right, each missing some frames.
fn crowded_source() -> InMemorySource {
    let mut source = InMemorySource::new();
    let mut next_id = 0;
    for cam_id in 0..2u32 {
        for t in 0..30u64 {
            for object in 0..5u64 {
                if (t * 7 + object * 3) % 5 == 0 {
                    continue;
                }
                let x = object as f64 * 50.0 + t as f64 * 2.0;
                let y = object as f64 * 10.0 + f64::from(cam_id);
                source.add_detection(
                    DetectionBuilder::new(next_id)
                        .timestamp(t)
                        .cam_id(cam_id)
                        .xy(x, y)
                        .bee_id_bits(object as u32, 12)
                        .build(),
                );
                next_id += 1;
            }
        }
    }
    source
}

fn crowded_walk() -> Vec<Track> {
    let config = WalkerConfig::default().with_frame_diff(2).with_radius(20.0);
    let mut walker = Walker::new(crowded_source(), PositionDistance, config);
    walker.calc_tracks(None, None).unwrap()
}

#[test]
fn test_every_detection_lands_in_exactly_one_track() {
    let tracks = crowded_walk();

    let mut seen: HashMap<u64, usize> = HashMap::new();
    for track in &tracks {
        assert!(track.is_consistent());
        for &id in &track.ids {
            *seen.entry(id).or_default() += 1;
        }
    }

    let total = (0..2u64)
        .flat_map(|_| (0..30u64).flat_map(|t| (0..5u64).map(move |object| (t, object))))
        .filter(|(t, object)| (t * 7 + object * 3) % 5 != 0)
        .count();
    assert_eq!(seen.len(), total);
    assert!(seen.values().all(|&count| count == 1));

    let track_ids: HashSet<_> = tracks.iter().map(|track| track.id.clone()).collect();
    assert_eq!(track_ids.len(), tracks.len());
}

#[test]
fn test_walk_recovers_objects_across_dropouts() {
    let tracks = crowded_walk();
    // one track per object and camera; dropouts never exceed frame_diff
    assert_eq!(tracks.len(), 10);
    for track in &tracks {
        let bits: HashSet<Vec<u64>> = track
            .detections()
            .iter()
            .map(|det| det.bee_id.iter().map(|b| *b as u64).collect())
            .collect();
        assert_eq!(bits.len(), 1, "track {} mixes objects", track.id);
    }
}

#[test]
fn test_walk_is_deterministic() {
    assert_eq!(crowded_walk(), crowded_walk());
}

#[test]
fn test_id_cost_function_separates_crossing_objects() {
    // two objects cross paths; positions alone are ambiguous at t1
    let mut source = InMemorySource::new();
    let tagged = |id: u64, t: u64, x: f64, bee: u32| {
        DetectionBuilder::new(id)
            .timestamp(t)
            .xy(x, 0.0)
            .bee_id_bits(bee, 12)
            .build()
    };
    source.extend_detections([
        tagged(1, 0, 0.0, 5),
        tagged(2, 0, 10.0, 9),
        tagged(3, 1, 6.0, 9),
        tagged(4, 1, 4.0, 5),
    ]);
    let config = WalkerConfig::default().with_radius(20.0);

    let mut walker = Walker::new(source, IdDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1, 4], vec![2, 3]]);
}

fn segment(id: u64, detections: Vec<Detection>) -> Track {
    let mut detections = detections.into_iter();
    let first = detections.next().unwrap();
    let mut track = Track::from_detection(TrackId::new(id), first);
    for det in detections {
        let timestamp = det.timestamp;
        track.push_detection(&det, timestamp);
    }
    track
}

#[test]
fn test_segments_are_stitched() {
    let mut source = InMemorySource::with_segments();
    source
        .add_segment(segment(
            10,
            vec![det(1, 0, 0.0, 0.0), det(2, 1, 1.0, 0.0), det(3, 2, 2.0, 0.0)],
        ))
        .unwrap();
    source
        .add_segment(segment(11, vec![det(4, 3, 3.0, 0.0), det(5, 4, 4.0, 0.0)]))
        .unwrap();
    source
        .add_segment(segment(12, vec![det(6, 3, 500.0, 500.0)]))
        .unwrap();
    source.add_frame(0, 5);
    let config = WalkerConfig::default()
        .with_frame_diff(2)
        .with_radius(10.0)
        .with_min_track_start_length(2)
        .with_track_prefix("stitch_");

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    // the length-1 segment may not open a track of its own
    assert_eq!(member_ids(&tracks), vec![vec![1, 2, 3, 4, 5]]);
    assert_eq!(tracks[0].timestamps, vec![0, 1, 2, 3, 4]);
    assert_eq!(tracks[0].id.to_string(), "stitch_0");
    assert!(tracks[0].is_consistent());

    let consumed: HashSet<TrackId> = [10, 11, 12].into_iter().map(TrackId::new).collect();
    assert_eq!(walker.assigned_segments(), &consumed);
}

#[test]
fn test_spliced_segment_is_not_revisited_until_it_ends() {
    // segment 11 spans t1..=t4; segment 12 at t2 must not join the track
    // that already consumed 11, even though it is in range
    let mut source = InMemorySource::with_segments();
    source
        .add_segment(segment(10, vec![det(1, 0, 0.0, 0.0)]))
        .unwrap();
    source
        .add_segment(segment(
            11,
            vec![
                det(2, 1, 1.0, 0.0),
                det(3, 2, 1.0, 0.0),
                det(4, 3, 1.0, 0.0),
                det(5, 4, 1.0, 0.0),
            ],
        ))
        .unwrap();
    source
        .add_segment(segment(12, vec![det(6, 2, 1.0, 1.0), det(7, 3, 1.0, 1.0)]))
        .unwrap();
    let config = WalkerConfig::default().with_frame_diff(5).with_radius(10.0);

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1, 2, 3, 4, 5], vec![6, 7]]);
}

#[test]
fn test_short_segment_still_extends_open_track() {
    let mut source = InMemorySource::with_segments();
    source
        .add_segment(segment(10, vec![det(1, 0, 0.0, 0.0), det(2, 1, 1.0, 0.0)]))
        .unwrap();
    source
        .add_segment(segment(11, vec![det(3, 2, 2.0, 0.0)]))
        .unwrap();
    let config = WalkerConfig::default()
        .with_radius(10.0)
        .with_min_track_start_length(2);

    let mut walker = Walker::new(source, PositionDistance, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1, 2, 3]]);
    assert_eq!(tracks[0].timestamps, vec![0, 1, 2]);
}

#[test]
fn test_consumed_segments_persist_across_walks() {
    let mut source = InMemorySource::with_segments();
    source
        .add_segment(segment(10, vec![det(1, 0, 0.0, 0.0), det(2, 1, 1.0, 0.0)]))
        .unwrap();
    source
        .add_segment(segment(11, vec![det(3, 2, 2.0, 0.0), det(4, 3, 3.0, 0.0)]))
        .unwrap();
    let config = WalkerConfig::default().with_radius(10.0);

    let mut walker = Walker::new(source, PositionDistance, config);
    let first = walker.calc_tracks(None, None).unwrap();
    assert_eq!(member_ids(&first), vec![vec![1, 2, 3, 4]]);

    let second = walker.calc_tracks(None, None).unwrap();
    assert!(second.is_empty());
    assert_eq!(walker.assigned_segments().len(), 2);
}

/// Reports a far-away detection from another frame as a neighbor of every
/// track.
struct StrayNeighborSource {
    inner: InMemorySource,
    stray: Detection,
}

impl CandidateSource for StrayNeighborSource {
    type Error = MemorySourceError;

    fn kind(&self) -> ObjectKind {
        self.inner.kind()
    }

    fn cam_ids(&self) -> Result<Vec<CamId>, Self::Error> {
        self.inner.cam_ids()
    }

    fn timestamps(&self, cam_id: CamId) -> Result<Vec<Timestamp>, Self::Error> {
        self.inner.timestamps(cam_id)
    }

    fn frame_objects(
        &self,
        cam_id: CamId,
        timestamp: Timestamp,
    ) -> Result<Vec<Detection>, Self::Error> {
        self.inner.frame_objects(cam_id, timestamp)
    }

    fn segments_starting(
        &self,
        cam_id: CamId,
        timestamp: Timestamp,
    ) -> Result<Vec<Track>, Self::Error> {
        self.inner.segments_starting(cam_id, timestamp)
    }

    fn neighbors(
        &self,
        track: &Track,
        cam_id: CamId,
        radius: f64,
        timestamp: Timestamp,
    ) -> Result<Vec<FrameObject>, Self::Error> {
        let mut neighbors = self.inner.neighbors(track, cam_id, radius, timestamp)?;
        neighbors.push(FrameObject::Detection(self.stray.clone()));
        Ok(neighbors)
    }

    fn detections_by_id(&self, ids: &[DetectionId]) -> Result<Vec<Detection>, Self::Error> {
        self.inner.detections_by_id(ids)
    }

    fn segments_by_id(&self, ids: &[TrackId]) -> Result<Vec<Track>, Self::Error> {
        self.inner.segments_by_id(ids)
    }
}

#[test]
fn test_neighbors_outside_current_frame_are_ignored() {
    let mut inner = source_with_frames(0..=2);
    inner.extend_detections([det(1, 0, 0.0, 0.0), det(2, 1, 1.0, 0.0), det(3, 2, 2.0, 0.0)]);
    let source = StrayNeighborSource {
        inner,
        stray: det(99, 7, 0.0, 0.0),
    };
    let score = ScoreFn::new(|tracks: &[&Track], candidates: &[&FrameObject]| {
        assert!(
            candidates
                .iter()
                .all(|candidate| candidate.id() != ObjectId::Detection(99))
        );
        Array1::from_elem(tracks.len(), 1.0)
    });
    let config = WalkerConfig::default().with_radius(10.0);

    let mut walker = Walker::new(source, score, config);
    let tracks = walker.calc_tracks(None, None).unwrap();

    assert_eq!(member_ids(&tracks), vec![vec![1, 2, 3]]);
}
