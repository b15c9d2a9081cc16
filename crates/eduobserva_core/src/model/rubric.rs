//! Rubric domain model and the reference registry.
//!
//! # Responsibility
//! - Define the immutable dimension/criterion catalog used by every
//!   observation.
//! - Provide lookup helpers shared by scoring and the capture workflow.
//!
//! # Invariants
//! - A rubric has at least one dimension and every dimension has at least one
//!   criterion.
//! - Dimension ids are unique; criterion ids are unique across the whole
//!   rubric (they are the keys of `TeacherObservation::scores`).
//! - Nothing mutates a rubric after construction.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One scorable rubric item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Criterion {
    pub id: String,
    pub label: String,
    pub description: String,
}

impl Criterion {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: description.into(),
        }
    }
}

/// Named pedagogical category grouping related criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dimension {
    pub id: String,
    pub title: String,
    /// Opaque display token (icon name) passed through to the UI.
    pub icon: String,
    pub criteria: Vec<Criterion>,
}

impl Dimension {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        icon: impl Into<String>,
        criteria: Vec<Criterion>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            icon: icon.into(),
            criteria,
        }
    }

    /// Returns whether `criterion_id` belongs to this dimension.
    pub fn contains(&self, criterion_id: &str) -> bool {
        self.criteria.iter().any(|criterion| criterion.id == criterion_id)
    }
}

/// Rubric construction errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RubricError {
    NoDimensions,
    EmptyDimension(String),
    DuplicateDimension(String),
    DuplicateCriterion(String),
}

impl Display for RubricError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDimensions => write!(f, "rubric must contain at least one dimension"),
            Self::EmptyDimension(id) => write!(f, "dimension `{id}` has no criteria"),
            Self::DuplicateDimension(id) => write!(f, "duplicate dimension id `{id}`"),
            Self::DuplicateCriterion(id) => write!(f, "duplicate criterion id `{id}`"),
        }
    }
}

impl Error for RubricError {}

/// Ordered, validated catalog of dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rubric {
    dimensions: Vec<Dimension>,
}

impl Rubric {
    /// Builds a rubric after checking the catalog invariants.
    pub fn new(dimensions: Vec<Dimension>) -> Result<Self, RubricError> {
        if dimensions.is_empty() {
            return Err(RubricError::NoDimensions);
        }

        let mut dimension_ids = HashSet::new();
        let mut criterion_ids = HashSet::new();
        for dimension in &dimensions {
            if !dimension_ids.insert(dimension.id.as_str()) {
                return Err(RubricError::DuplicateDimension(dimension.id.clone()));
            }
            if dimension.criteria.is_empty() {
                return Err(RubricError::EmptyDimension(dimension.id.clone()));
            }
            for criterion in &dimension.criteria {
                if !criterion_ids.insert(criterion.id.as_str()) {
                    return Err(RubricError::DuplicateCriterion(criterion.id.clone()));
                }
            }
        }

        Ok(Self { dimensions })
    }

    /// Returns the dimensions in display order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension_count(&self) -> usize {
        self.dimensions.len()
    }

    pub fn criterion_count(&self) -> usize {
        self.dimensions
            .iter()
            .map(|dimension| dimension.criteria.len())
            .sum()
    }

    pub fn dimension_at(&self, index: usize) -> Option<&Dimension> {
        self.dimensions.get(index)
    }

    pub fn dimension(&self, dimension_id: &str) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .find(|dimension| dimension.id == dimension_id)
    }

    pub fn criterion(&self, criterion_id: &str) -> Option<&Criterion> {
        self.dimensions
            .iter()
            .flat_map(|dimension| dimension.criteria.iter())
            .find(|criterion| criterion.id == criterion_id)
    }

    /// Returns the dimension owning `criterion_id`.
    pub fn dimension_of(&self, criterion_id: &str) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .find(|dimension| dimension.contains(criterion_id))
    }
}

static REFERENCE_RUBRIC: Lazy<Rubric> = Lazy::new(build_reference_rubric);

/// Returns the reference rubric (9 dimensions x 4 criteria).
pub fn reference_rubric() -> &'static Rubric {
    &REFERENCE_RUBRIC
}

/// Lists the reference dimensions in display order.
pub fn list_dimensions() -> &'static [Dimension] {
    REFERENCE_RUBRIC.dimensions()
}

type CriterionRow = (&'static str, &'static str, &'static str);
type DimensionRow = (&'static str, &'static str, &'static str, [CriterionRow; 4]);

const REFERENCE_DIMENSIONS: [DimensionRow; 9] = [
    (
        "planeacion",
        "Planeación",
        "fa-calendar-check",
        [
            ("p1", "Aprendizaje Activo", "Diseño de estrategias centradas en el estudiante."),
            ("p2", "Contexto Sociocultural", "Vinculación con saberes locales y regionales."),
            ("p3", "Diversidad de Estilos", "Estrategias diferenciadas presentes en la planeación."),
            ("p4", "IA y Tecnologías", "Incorporación de IA y TIC en la planificación."),
        ],
    ),
    (
        "ejecucion",
        "Ejecución",
        "fa-chalkboard-user",
        [
            ("e1", "Metodologías Activas", "Aplicación de ABP, aprendizaje cooperativo, etc."),
            ("e2", "Aprendizaje Significativo", "Alumnos relacionan contenidos con vida cotidiana."),
            ("e3", "Pensamiento Crítico", "Fomento del análisis y la argumentación."),
            ("e4", "Recursos Contextualizados", "Pertinencia de materiales empleados en aula."),
        ],
    ),
    (
        "monitoreo",
        "Monitoreo",
        "fa-chart-line",
        [
            ("m1", "Seguimiento de Avances", "Frecuencia de evaluaciones formativas."),
            ("m2", "Retroalimentación", "Observación y retroalimentación de la práctica."),
            ("m3", "Análisis de Datos", "Uso de sistemas de información para decisiones."),
            ("m4", "Mejora Continua", "Acciones correctivas basadas en resultados."),
        ],
    ),
    (
        "evaluacion",
        "Evaluación",
        "fa-clipboard-check",
        [
            ("ev1", "Evaluación Formativa", "Uso de rúbricas, portafolios y coevaluación."),
            ("ev2", "Impacto en Aprendizaje", "Mejora de desempeño tras retroalimentación."),
            ("ev3", "Criterios de Diversidad", "Ajustes razonables para NEE en evaluación."),
            ("ev4", "Participación Estudiantil", "Alumnos aportan perspectiva en evaluación."),
        ],
    ),
    (
        "inclusion",
        "Inclusión",
        "fa-hands-holding-child",
        [
            ("i1", "Diversidad Cultural", "Inclusión de lenguas indígenas y cultura local."),
            ("i2", "Equidad Educativa", "Adaptaciones curriculares para discapacidad."),
            ("i3", "Vulnerabilidad", "Inclusión de estudiantes en vulnerabilidad."),
            ("i4", "Accesibilidad Material", "Recursos adecuados para necesidades especiales."),
        ],
    ),
    (
        "derechos",
        "Derechos Humanos",
        "fa-scale-balanced",
        [
            ("d1", "Cultura de Paz", "Valores democráticos y respeto."),
            ("d2", "Prevención Violencia", "Acciones para atender conflictos y discriminación."),
            ("d3", "Toma de Decisiones", "Espacios de participación del alumnado."),
            ("d4", "Protección de Derechos", "Aplicación de protocolos institucionales."),
        ],
    ),
    (
        "etica",
        "Ética",
        "fa-gavel",
        [
            ("et1", "Principios Éticos", "Responsabilidad, honestidad y solidaridad."),
            ("et2", "Transparencia", "Rendición de cuentas en gestión escolar."),
            ("et3", "Ética Profesional", "Confidencialidad e imparcialidad docente."),
            ("et4", "Reflexión Ética", "Análisis de dilemas éticos en contenidos."),
        ],
    ),
    (
        "alfabetizacion",
        "Alfabetización Inicial",
        "fa-book-open-reader",
        [
            ("a1", "Adquisición Lectoescritura", "Niveles esperados en comprensión y producción."),
            ("a2", "Estrategias Innovadoras", "Variedad de métodos en enseñanza inicial."),
            ("a3", "Multimodalidad", "Combinación de lectura, imagen y tecnología."),
            ("a4", "Participación Familiar", "Familias involucradas en el apoyo lector."),
        ],
    ),
    (
        "comunidad",
        "Participación Comunitaria",
        "fa-users-rectangle",
        [
            ("c1", "Vínculo Organizaciones", "Colaboraciones con actores comunitarios."),
            ("c2", "Participación Familiar", "Presencia de padres y tutores en eventos."),
            ("c3", "Identidad Cultural", "Proyectos que rescatan historia y tradiciones."),
            ("c4", "Espacios Comunitarios", "Aprendizaje fuera del aula en la comunidad."),
        ],
    ),
];

fn build_reference_rubric() -> Rubric {
    let dimensions = REFERENCE_DIMENSIONS
        .iter()
        .map(|(id, title, icon, criteria)| {
            Dimension::new(
                *id,
                *title,
                *icon,
                criteria
                    .iter()
                    .map(|(id, label, description)| Criterion::new(*id, *label, *description))
                    .collect(),
            )
        })
        .collect();

    // Unvalidated: the table is constant and covered by unit tests.
    Rubric { dimensions }
}
