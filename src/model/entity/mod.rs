mod user;
pub use user::{UserEntity, UserEntityCreateUpdate};

mod email_domain;
pub use email_domain::AllowedEmailDomain;

mod course;
pub use course::{Course, CourseCreate};

mod module;
pub use module::{Module, ModuleCreate, ModuleWithLessonsRow};

mod lesson;
pub use lesson::{Lesson, LessonCreate, LessonLocation, LessonWithProgressRow};

mod payment;
pub use payment::{Payment, PaymentConfirmation, PaymentSignal, PaymentStatus};

mod enrollment;
pub use enrollment::{
    Aggregate, AggregateUpdate, CourseProgress, Dashboard, DashboardStats, Enrollment,
    ProgressBreakdown,
};

mod lesson_progress;
pub use lesson_progress::{LessonProgress, LessonProgressUpdate, MAX_TIME_DELTA_MINUTES, ProgressUpdate};

mod certificate;
pub use certificate::{Certificate, CertificateVerification};

mod quiz;
pub use quiz::{Quiz, QuizCreate, QuizQuestion, QuizQuestionCreate, QuizQuestionView, QuizView, QuizWithQuestions};

mod quiz_attempt;
pub use quiz_attempt::{AttemptStart, QuizAnswer, QuizAnswerSubmit, QuizAttempt};

mod assignment;
pub use assignment::{
    Assignment, AssignmentCreate, AssignmentSubmission, GradeRecipient, SubmissionGrade,
};

mod review;
pub use review::{CourseReview, ReviewSubmit, ReviewWithAuthor};

mod stats;
pub use stats::{CourseAnalytics, PlatformStats, RecentEnrollment, RecentPayment};
