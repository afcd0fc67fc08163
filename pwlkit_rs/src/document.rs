use crate::error::{PwlkitError, PwlkitResult};
use crate::point::Point;

/// How `serialize` renders time tokens. The policy travels with the in-memory
/// document, never with the file text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportPolicy {
    #[default]
    PreserveMixed,
    ForceRelative,
    ForceAbsolute,
}

/// An ordered sequence of points plus the export policy. Insertion order is
/// intended to be time order, but nothing here enforces it; the repair engine
/// deals with violations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    points: Vec<Point>,
    export_policy: ExportPolicy,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<Point>) -> Self {
        Self {
            points,
            export_policy: ExportPolicy::default(),
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn export_policy(&self) -> ExportPolicy {
        self.export_policy
    }

    pub fn set_export_policy(&mut self, policy: ExportPolicy) {
        self.export_policy = policy;
    }

    pub fn push_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn insert_point(&mut self, index: usize, point: Point) -> PwlkitResult<()> {
        if index > self.points.len() {
            return Err(PwlkitError::IndexOutOfBounds(index));
        }
        self.points.insert(index, point);
        Ok(())
    }

    pub fn remove_point(&mut self, index: usize) -> PwlkitResult<Point> {
        if index >= self.points.len() {
            return Err(PwlkitError::IndexOutOfBounds(index));
        }
        Ok(self.points.remove(index))
    }

    /// Overwrite a point's numbers in place. Cached token text is cleared so
    /// the next serialization reformats both fields.
    pub fn update_point(&mut self, index: usize, time: f64, value: f64) -> PwlkitResult<()> {
        let point = self
            .points
            .get_mut(index)
            .ok_or(PwlkitError::IndexOutOfBounds(index))?;
        point.set_time(time);
        point.set_value(value);
        Ok(())
    }

    pub fn replace_points(&mut self, points: Vec<Point>) {
        self.points = points;
    }

    pub fn extend_points(&mut self, points: impl IntoIterator<Item = Point>) {
        self.points.extend(points);
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Absolute time of every point, accumulated left to right. A relative
    /// first point counts from zero.
    pub fn effective_times(&self) -> Vec<f64> {
        let mut times = Vec::with_capacity(self.points.len());
        let mut current = 0.0;
        for point in &self.points {
            current = if point.time_is_relative() {
                current + point.time()
            } else {
                point.time()
            };
            times.push(current);
        }
        times
    }

    pub fn effective_time(&self, index: usize) -> Option<f64> {
        if index >= self.points.len() {
            return None;
        }
        Some(self.effective_times()[index])
    }

    /// Effective time of the last point, or zero for an empty document.
    pub fn end_time(&self) -> f64 {
        self.effective_times().last().copied().unwrap_or(0.0)
    }

    /// Rewrite every point onto an absolute time base, keeping each point's
    /// notation by re-deriving its text through the codec.
    pub fn to_absolute(&mut self) {
        let times = self.effective_times();
        for (point, time) in self.points.iter_mut().zip(times) {
            point.rebase(time, false);
        }
    }

    /// Rewrite every point after the first as a delta from its predecessor.
    /// The first point becomes absolute, which also normalizes a relative
    /// leading point onto its relative-to-zero effective time.
    pub fn to_relative(&mut self) {
        let times = self.effective_times();
        let mut previous = 0.0;
        for (index, (point, time)) in self.points.iter_mut().zip(times).enumerate() {
            if index == 0 {
                point.rebase(time, false);
            } else {
                point.rebase(time - previous, true);
            }
            previous = time;
        }
    }
}

#[cfg(test)]
mod test {
    use super::{Document, ExportPolicy};
    use crate::point::Point;

    fn setup() -> Document {
        Document::from_points(vec![
            Point::absolute(0.0, 0.0),
            Point::relative(1e-3, 1.0),
            Point::relative(1e-3, 2.0),
        ])
    }

    #[test]
    fn test_effective_times_accumulate_deltas() {
        let doc = setup();
        let times = doc.effective_times();
        assert_eq!(times, vec![0.0, 1e-3, 2e-3]);
        assert_eq!(doc.end_time(), 2e-3);
    }

    #[test]
    fn test_relative_first_point_counts_from_zero() {
        let doc = Document::from_points(vec![
            Point::relative(1e-3, 0.0),
            Point::relative(1e-3, 1.0),
        ]);
        assert_eq!(doc.effective_times(), vec![1e-3, 2e-3]);
    }

    #[test]
    fn test_to_absolute_rewrites_in_place() {
        let mut doc = setup();
        doc.to_absolute();
        for point in doc.points() {
            assert!(!point.time_is_relative());
        }
        assert_eq!(doc.effective_times(), vec![0.0, 1e-3, 2e-3]);
        assert_eq!(doc.points()[2].time(), 2e-3);
    }

    #[test]
    fn test_time_base_round_trip() {
        let mut doc = Document::from_points(vec![
            Point::absolute(0.0, 0.0),
            Point::absolute(3.3e-4, 1.5),
            Point::absolute(7.1e-4, -0.5),
            Point::absolute(1.9e-3, 2.0),
        ]);
        let reference = doc.effective_times();
        doc.to_relative();
        doc.to_absolute();
        for (a, b) in doc.effective_times().iter().zip(&reference) {
            assert!((a - b).abs() <= 1e-12 * b.abs().max(1.0));
        }
    }

    #[test]
    fn test_update_point_clears_text() {
        let mut doc = crate::parser::parse("1m 1\n2m 2\n").unwrap();
        doc.update_point(0, 1.5e-3, 1.1).unwrap();
        assert_eq!(doc.points()[0].time_text(), None);
        assert_eq!(doc.points()[0].value_text(), None);
        assert!(doc.update_point(5, 0.0, 0.0).is_err());
    }

    #[test]
    fn test_insert_and_remove() {
        let mut doc = setup();
        doc.insert_point(1, Point::absolute(5e-4, 0.5)).unwrap();
        assert_eq!(doc.len(), 4);
        let removed = doc.remove_point(1).unwrap();
        assert_eq!(removed.time(), 5e-4);
        assert!(doc.remove_point(9).is_err());
        assert!(doc.insert_point(9, Point::absolute(0.0, 0.0)).is_err());
    }

    #[test]
    fn test_export_policy_travels_with_document() {
        let mut doc = setup();
        assert_eq!(doc.export_policy(), ExportPolicy::PreserveMixed);
        doc.set_export_policy(ExportPolicy::ForceAbsolute);
        assert_eq!(doc.export_policy(), ExportPolicy::ForceAbsolute);
    }
}
