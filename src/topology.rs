use serde::Deserialize;

/// Left/right/middle grouping of keypoint indices for one model.
#[derive(Clone, Copy, Debug)]
pub struct KeypointSides {
    pub left: &'static [usize],
    pub right: &'static [usize],
    pub middle: &'static [usize],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    Middle,
}

impl KeypointSides {
    pub fn side_of(&self, index: usize) -> Option<Side> {
        if self.middle.contains(&index) {
            Some(Side::Middle)
        } else if self.left.contains(&index) {
            Some(Side::Left)
        } else if self.right.contains(&index) {
            Some(Side::Right)
        } else {
            None
        }
    }
}

/// Keypoint layout of a pose model: names, sides and skeleton edges.
pub trait KeypointTopology {
    fn keypoint_names(&self) -> &'static [&'static str];
    fn keypoint_index_by_side(&self) -> KeypointSides;
    fn adjacent_pairs(&self) -> &'static [(usize, usize)];

    fn index_of(&self, name: &str) -> Option<usize> {
        self.keypoint_names().iter().position(|n| *n == name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoseModel {
    #[default]
    MoveNet,
    PoseNet,
    BlazePose,
}

impl PoseModel {
    pub fn label(&self) -> &'static str {
        match self {
            PoseModel::MoveNet => "MoveNet",
            PoseModel::PoseNet => "PoseNet",
            PoseModel::BlazePose => "BlazePose",
        }
    }

    pub fn default_score_threshold(&self) -> f32 {
        match self {
            PoseModel::MoveNet => 0.3,
            PoseModel::PoseNet => 0.5,
            PoseModel::BlazePose => 0.65,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "movenet" => Some(PoseModel::MoveNet),
            "posenet" => Some(PoseModel::PoseNet),
            "blazepose" => Some(PoseModel::BlazePose),
            _ => None,
        }
    }
}

impl KeypointTopology for PoseModel {
    fn keypoint_names(&self) -> &'static [&'static str] {
        match self {
            PoseModel::MoveNet | PoseModel::PoseNet => COCO_KEYPOINTS,
            PoseModel::BlazePose => BLAZEPOSE_KEYPOINTS,
        }
    }

    fn keypoint_index_by_side(&self) -> KeypointSides {
        match self {
            PoseModel::MoveNet | PoseModel::PoseNet => KeypointSides {
                left: &[1, 3, 5, 7, 9, 11, 13, 15],
                right: &[2, 4, 6, 8, 10, 12, 14, 16],
                middle: &[0],
            },
            PoseModel::BlazePose => KeypointSides {
                left: &[1, 2, 3, 7, 9, 11, 13, 15, 17, 19, 21, 23, 25, 27, 29, 31],
                right: &[4, 5, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 26, 28, 30, 32],
                middle: &[0],
            },
        }
    }

    fn adjacent_pairs(&self) -> &'static [(usize, usize)] {
        match self {
            PoseModel::MoveNet | PoseModel::PoseNet => COCO_CONNECTIONS,
            PoseModel::BlazePose => BLAZEPOSE_CONNECTIONS,
        }
    }
}

const COCO_KEYPOINTS: &[&str] = &[
    "nose",
    "left_eye",
    "right_eye",
    "left_ear",
    "right_ear",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
];

const BLAZEPOSE_KEYPOINTS: &[&str] = &[
    "nose",
    "left_eye_inner",
    "left_eye",
    "left_eye_outer",
    "right_eye_inner",
    "right_eye",
    "right_eye_outer",
    "left_ear",
    "right_ear",
    "mouth_left",
    "mouth_right",
    "left_shoulder",
    "right_shoulder",
    "left_elbow",
    "right_elbow",
    "left_wrist",
    "right_wrist",
    "left_pinky",
    "right_pinky",
    "left_index",
    "right_index",
    "left_thumb",
    "right_thumb",
    "left_hip",
    "right_hip",
    "left_knee",
    "right_knee",
    "left_ankle",
    "right_ankle",
    "left_heel",
    "right_heel",
    "left_foot_index",
    "right_foot_index",
];

const COCO_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (0, 2),
    (1, 3),
    (2, 4),
    (5, 6),
    (5, 7),
    (5, 11),
    (6, 8),
    (6, 12),
    (7, 9),
    (8, 10),
    (11, 12),
    (11, 13),
    (12, 14),
    (13, 15),
    (14, 16),
];

const BLAZEPOSE_CONNECTIONS: &[(usize, usize)] = &[
    (0, 1),
    (0, 4),
    (1, 2),
    (2, 3),
    (3, 7),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (11, 23),
    (12, 14),
    (14, 16),
    (12, 24),
    (13, 15),
    (15, 17),
    (16, 18),
    (15, 21),
    (16, 22),
    (17, 19),
    (18, 20),
    (15, 19),
    (16, 20),
    (23, 25),
    (23, 24),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (27, 31),
    (28, 32),
    (29, 31),
    (30, 32),
];
